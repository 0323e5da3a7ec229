use anyhow::{Context, Result};
use serde::Deserialize;

use crate::live::pipeline::DEFAULT_STALE_AFTER_HOURS;
use crate::live::LIVE_MARKER;

/// One year
const MAX_STALE_CUTOFF_HOURS: i64 = 24 * 365;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gmail: GmailConfig,
    pub discovery: DiscoveryConfig,
    pub slack: Option<SlackConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GmailConfig {
    pub credentials_path: String,
    pub token_cache_path: String,
    /// Name of the label to watch, resolved to an id at startup
    pub label: String,
    pub max_results: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    pub poll_interval_secs: u64,
    pub stale_cutoff_hours: i64,
    pub live_marker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub channel_id: String,
}

/// Flat view of the environment, before it is split into sections
#[derive(Debug, Deserialize)]
struct Settings {
    gmail_credentials_path: Option<String>,
    gmail_token_cache_path: String,
    gmail_label: String,
    gmail_max_results: u32,
    poll_interval_secs: u64,
    stale_cutoff_hours: i64,
    live_marker: String,
    slack_bot_token: Option<String>,
    slack_channel_id: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    /// Build the configuration from an environment source layered over defaults
    pub fn load(environment: config::Environment) -> Result<Self> {
        let settings: Settings = config::Config::builder()
            .set_default("gmail_token_cache_path", "./gmail-token-cache.json")?
            .set_default("gmail_label", "CATEGORY_SOCIAL")?
            .set_default("gmail_max_results", 50_i64)?
            .set_default("poll_interval_secs", 60_i64)?
            .set_default("stale_cutoff_hours", DEFAULT_STALE_AFTER_HOURS)?
            .set_default("live_marker", LIVE_MARKER)?
            .add_source(environment.try_parsing(true))
            .build()
            .context("Unable to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Settings) -> Result<Self> {
        let credentials_path = match settings.gmail_credentials_path {
            Some(path) if !path.is_empty() => path,
            _ => anyhow::bail!(
                "Missing environment variables: GMAIL_CREDENTIALS_PATH\n\
                 \n\
                 💡 Solutions:\n\
                 1. Create a .env file with your credentials:\n\
                    GMAIL_CREDENTIALS_PATH=/path/to/client_credentials.json\n\
                 \n\
                 2. Or export the variables manually:\n\
                    export GMAIL_CREDENTIALS_PATH=/path/to/client_credentials.json\n\
                    export GMAIL_TOKEN_CACHE_PATH=./gmail-token-cache.json\n\
                    cargo run -- --once"
            ),
        };

        if settings.poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be greater than zero");
        }
        if settings.stale_cutoff_hours <= 0 || settings.stale_cutoff_hours > MAX_STALE_CUTOFF_HOURS {
            anyhow::bail!(
                "STALE_CUTOFF_HOURS must be between 1 and {}",
                MAX_STALE_CUTOFF_HOURS
            );
        }

        let slack = match (settings.slack_bot_token, settings.slack_channel_id) {
            (Some(bot_token), Some(channel_id)) => Some(SlackConfig { bot_token, channel_id }),
            _ => {
                log::warn!("SLACK_BOT_TOKEN or SLACK_CHANNEL_ID not set - Slack notifications disabled");
                None
            }
        };

        Ok(Config {
            gmail: GmailConfig {
                credentials_path,
                token_cache_path: settings.gmail_token_cache_path,
                label: settings.gmail_label,
                max_results: settings.gmail_max_results,
            },
            discovery: DiscoveryConfig {
                poll_interval_secs: settings.poll_interval_secs,
                stale_cutoff_hours: settings.stale_cutoff_hours,
                live_marker: settings.live_marker,
            },
            slack,
        })
    }
}
