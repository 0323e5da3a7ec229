use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::time::Duration;

use livewatch::config::Config;
use livewatch::gmail_client::GmailClient;
use livewatch::live::DiscoveryPipeline;
use livewatch::poller::PollLoop;
use livewatch::sink::StdoutSink;
use livewatch::slack_notifier::SlackNotifier;

#[derive(Parser)]
#[command(name = "livewatch")]
#[command(about = "Watch a Gmail label for YouTube live notifications and report the video ids")]
#[command(version = "0.1.0")]
struct Args {
    /// Run the full scan once and exit instead of polling
    #[arg(long)]
    once: bool,

    /// Polling interval in seconds (overrides POLL_INTERVAL_SECS)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Name of the label to watch (overrides GMAIL_LABEL)
    #[arg(short, long)]
    label: Option<String>,

    /// Print discoveries as JSON lines
    #[arg(long)]
    json: bool,

    /// List mailbox labels and exit
    #[arg(long)]
    list_labels: bool,

    /// Check the configuration without connecting
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Starting livewatch");

    let mut config = Config::new()?;

    if let Some(label) = args.label.clone() {
        config.gmail.label = label;
    }
    if let Some(interval) = args.interval {
        if interval == 0 {
            anyhow::bail!("--interval must be greater than zero");
        }
        config.discovery.poll_interval_secs = interval;
    }

    if args.check_config {
        println!("✅ Configuration valid!");
        println!("📧 Gmail API OAuth2");
        println!("🔑 Credentials: {}", config.gmail.credentials_path);
        println!("💾 Token cache: {}", config.gmail.token_cache_path);
        println!("🏷️  Label: {}", config.gmail.label);
        println!("⏱️  Poll interval: {}s", config.discovery.poll_interval_secs);
        println!("⌛ Stale cutoff: {}h", config.discovery.stale_cutoff_hours);
        println!("💬 Slack: {}", if config.slack.is_some() { "enabled" } else { "disabled" });
        return Ok(());
    }

    let gmail = GmailClient::new(&config.gmail)
        .await
        .context("Unable to connect to Gmail API")?;

    if args.list_labels {
        return gmail.list_labels().await;
    }

    let label_id = gmail.resolve_label(&config.gmail.label).await?;

    let mut poller = PollLoop::new(
        gmail,
        DiscoveryPipeline::from_config(&config.discovery),
        label_id,
        Duration::from_secs(config.discovery.poll_interval_secs),
    )
    .with_sink(Box::new(StdoutSink::new(args.json)));

    if let Some(slack_config) = &config.slack {
        match SlackNotifier::new(slack_config) {
            Ok(notifier) => {
                info!("✅ Slack notifications enabled");
                poller = poller.with_sink(Box::new(notifier));
            }
            Err(e) => {
                error!("⚠️  Unable to initialize Slack notifier: {} - notifications disabled", e);
            }
        }
    }

    if args.once {
        let outcome = poller.bootstrap().await?;
        info!("✅ Scan completed: {} live stream(s) found", outcome.discoveries.len());
        return Ok(());
    }

    tokio::select! {
        _ = poller.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Unable to listen for Ctrl+C")?;
            info!("👋 Shutting down");
        }
    }

    Ok(())
}
