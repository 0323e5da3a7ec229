use std::collections::HashSet;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use futures::future::BoxFuture;
use google_gmail1::api::{History, Scope};
use google_gmail1::{hyper, hyper_rustls, oauth2, Gmail};
use log::{debug, info, warn};

use crate::config::GmailConfig;
use crate::email::{MailSource, Notification, Watermark};
use crate::error::TransportError;

const USER_ID: &str = "me";

pub struct GmailClient {
    hub: Gmail<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>,
    max_results: u32,
}

impl GmailClient {
    pub async fn new(config: &GmailConfig) -> Result<Self> {
        info!("Connecting to Gmail API via OAuth2");

        // Read OAuth2 client credentials from file
        let secret = oauth2::read_application_secret(&config.credentials_path)
            .await
            .context("Unable to read OAuth2 client credentials file")?;

        // Consent happens once in the browser, then the token is cached on disk
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(&config.token_cache_path)
        .build()
        .await
        .context("Unable to create OAuth2 authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = hyper::Client::builder().build(connector);
        let hub = Gmail::new(client, auth);

        info!("✅ Gmail API connection established successfully");

        Ok(GmailClient {
            hub,
            max_results: config.max_results,
        })
    }

    /// Find the id of the label called `name`
    pub async fn resolve_label(&self, name: &str) -> Result<String> {
        info!("Resolving label '{}'", name);

        let result = self.hub
            .users()
            .labels_list(USER_ID)
            .add_scope(Scope::Readonly)
            .doit()
            .await
            .context("Unable to list labels")?;

        let labels = result.1.labels.unwrap_or_default();
        if labels.is_empty() {
            anyhow::bail!("No labels found in mailbox");
        }

        let id = labels
            .into_iter()
            .find(|l| l.name.as_deref() == Some(name))
            .and_then(|l| l.id)
            .with_context(|| format!("Label '{}' can not be found", name))?;

        info!("Watching label '{}' (id: {})", name, id);
        Ok(id)
    }

    /// List all Gmail labels with their IDs and names
    pub async fn list_labels(&self) -> Result<()> {
        info!("Retrieving Gmail labels list");

        let result = self.hub
            .users()
            .labels_list(USER_ID)
            .add_scope(Scope::Readonly)
            .doit()
            .await
            .context("Unable to list labels")?;

        let mut labels = result.1.labels.unwrap_or_default();

        if labels.is_empty() {
            println!("No labels found.");
            return Ok(());
        }

        println!("Found {} label(s):\n", labels.len());
        println!("{:<40} {:<30} {:<15}", "Label Name", "Label ID", "Type");
        println!("{}", "=".repeat(85));

        labels.sort_by(|a, b| a.name.as_deref().unwrap_or("").cmp(b.name.as_deref().unwrap_or("")));

        for label in labels {
            let name = label.name.unwrap_or_else(|| "Unknown".to_string());
            let id = label.id.unwrap_or_else(|| "Unknown".to_string());
            let label_type = label.type_.unwrap_or_else(|| "Unknown".to_string());
            println!("{:<40} {:<30} {:<15}", name, id, label_type);
        }

        Ok(())
    }

    /// Retrieve a message in RAW format
    pub async fn fetch_notification(&self, message_id: &str) -> Result<Notification, TransportError> {
        debug!("Retrieving raw message {}", message_id);

        let (_, message) = self.hub
            .users()
            .messages_get(USER_ID, message_id)
            .format("raw")
            .add_scope(Scope::Readonly)
            .doit()
            .await?;

        // The client library already undoes the transport encoding; restore it
        // so every source hands the decoder the same wire form.
        let raw = message.raw.ok_or(TransportError::MissingField("raw"))?;
        let revision = message.history_id.ok_or(TransportError::MissingField("historyId"))?;
        let millis = message.internal_date.ok_or(TransportError::MissingField("internalDate"))?;
        let received_at = chrono::DateTime::from_timestamp_millis(millis)
            .ok_or(TransportError::MissingField("internalDate"))?;

        debug!("Message {} retrieved, size: {} bytes, received {}", message_id, raw.len(), received_at);

        Ok(Notification {
            id: message.id.unwrap_or_else(|| message_id.to_string()),
            received_at,
            raw: URL_SAFE.encode(raw),
            revision,
        })
    }

    /// Fetch each id in turn; messages that disappeared in the meantime are skipped
    async fn fetch_all(&self, message_ids: Vec<String>) -> Result<Vec<Notification>, TransportError> {
        let mut notifications = Vec::with_capacity(message_ids.len());

        for message_id in message_ids {
            match self.fetch_notification(&message_id).await {
                Ok(notification) => notifications.push(notification),
                Err(TransportError::Api(e)) if is_not_found(&e) => {
                    warn!("Message {} vanished before it could be fetched", message_id);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(notifications)
    }

    async fn search_label(&self, label: &str) -> Result<Vec<Notification>, TransportError> {
        info!("Searching for messages with label '{}'", label);

        let (_, list) = self.hub
            .users()
            .messages_list(USER_ID)
            .add_label_ids(label)
            .max_results(self.max_results)
            .add_scope(Scope::Readonly)
            .doit()
            .await?;

        let message_ids: Vec<String> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg| msg.id)
            .collect();

        info!("Found {} message(s) with label '{}'", message_ids.len(), label);

        self.fetch_all(message_ids).await
    }

    async fn history_since(&self, label: &str, watermark: Watermark) -> Result<(Vec<Notification>, u64), TransportError> {
        debug!("Listing history for label '{}' since revision {}", label, watermark.revision());

        let mut fold = HistoryFold::new(watermark.revision());
        let mut page_token: Option<String> = None;

        loop {
            let mut call = self.hub
                .users()
                .history_list(USER_ID)
                .start_history_id(watermark.revision())
                .label_id(label)
                .add_history_types("messageAdded")
                .add_scope(Scope::Readonly);
            if let Some(token) = &page_token {
                call = call.page_token(token);
            }

            let (_, response) = call.doit().await?;

            fold.absorb(response.history.unwrap_or_default());

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        let (added, highest) = fold.finish();

        if !added.is_empty() {
            info!("{} new message(s) with label '{}' since revision {}", added.len(), label, watermark.revision());
        }

        let notifications = self.fetch_all(added).await?;
        Ok((notifications, highest))
    }

    async fn profile_revision(&self) -> Result<u64, TransportError> {
        let (_, profile) = self.hub
            .users()
            .get_profile(USER_ID)
            .add_scope(Scope::Readonly)
            .doit()
            .await?;

        profile.history_id.ok_or(TransportError::MissingField("historyId"))
    }
}

/// Accumulates `messageAdded` records across history pages
struct HistoryFold {
    added: Vec<String>,
    seen: HashSet<String>,
    highest: u64,
}

impl HistoryFold {
    fn new(start: u64) -> Self {
        HistoryFold {
            added: Vec::new(),
            seen: HashSet::new(),
            highest: start,
        }
    }

    fn absorb(&mut self, records: Vec<History>) {
        for record in records {
            if let Some(id) = record.id {
                self.highest = self.highest.max(id);
            }
            for message_added in record.messages_added.unwrap_or_default() {
                if let Some(id) = message_added.message.and_then(|m| m.id) {
                    if self.seen.insert(id.clone()) {
                        self.added.push(id);
                    }
                }
            }
        }
    }

    /// Message ids newest first, and the highest history id seen.
    ///
    /// History is listed oldest first; the pipeline expects newest first.
    fn finish(mut self) -> (Vec<String>, u64) {
        self.added.reverse();
        (self.added, self.highest)
    }
}

fn is_not_found(error: &google_gmail1::Error) -> bool {
    match error {
        google_gmail1::Error::BadRequest(value) => value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_u64())
            == Some(404),
        google_gmail1::Error::Failure(response) => response.status() == hyper::StatusCode::NOT_FOUND,
        _ => false,
    }
}

impl MailSource for GmailClient {
    fn list_by_label<'a>(
        &'a self,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Notification>, TransportError>> {
        Box::pin(self.search_label(label))
    }

    fn list_since<'a>(
        &'a self,
        label: &'a str,
        watermark: Watermark,
    ) -> BoxFuture<'a, Result<(Vec<Notification>, u64), TransportError>> {
        Box::pin(self.history_since(label, watermark))
    }

    fn current_revision(&self) -> BoxFuture<'_, Result<u64, TransportError>> {
        Box::pin(self.profile_revision())
    }
}
