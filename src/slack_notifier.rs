use anyhow::{Context, Result};
use futures::future::BoxFuture;
use log::{error, info};
use slack_morphism::prelude::*;

use crate::config::SlackConfig;
use crate::email::Discovery;
use crate::sink::DiscoverySink;

pub struct SlackNotifier {
    client: SlackClient<SlackClientHyperHttpsConnector>,
    token: SlackApiToken,
    channel_id: SlackChannelId,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        info!("Initializing Slack notifier");

        let client = SlackClient::new(SlackClientHyperHttpsConnector::new()?);
        let token = SlackApiToken::new(config.bot_token.clone().into());
        let channel_id = SlackChannelId::new(config.channel_id.clone());

        Ok(SlackNotifier {
            client,
            token,
            channel_id,
        })
    }

    /// Post a plain text message to the configured channel
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let post_chat_req = SlackApiChatPostMessageRequest::new(
            self.channel_id.clone(),
            SlackMessageContent::new().with_text(text.to_string()),
        );

        let session = self.client.open_session(&self.token);

        match session.chat_post_message(&post_chat_req).await {
            Ok(response) => {
                info!("✅ Slack message sent: {:?}", response.ts);
                Ok(())
            }
            Err(e) => {
                error!("❌ Error sending Slack message: {}", e);
                Err(e).context("Unable to send Slack message")
            }
        }
    }

    /// Announce the live streams found in one batch
    pub async fn notify_discoveries(&self, discoveries: &[Discovery]) -> Result<()> {
        if discoveries.is_empty() {
            return Ok(());
        }

        info!("Sending Slack notification for {} live stream(s)", discoveries.len());
        self.send_message(&format_discoveries(discoveries)).await
    }
}

pub fn format_discoveries(discoveries: &[Discovery]) -> String {
    let mut text = format!("🔴 *{} live stream(s) started*\n", discoveries.len());
    for discovery in discoveries {
        text.push_str(&format!("• <{}|{}>\n", discovery.watch_url(), discovery.video_id));
    }
    text
}

impl DiscoverySink for SlackNotifier {
    fn publish<'a>(&'a self, discoveries: &'a [Discovery]) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.notify_discoveries(discoveries))
    }

    fn sink_name(&self) -> &str {
        "slack"
    }
}
