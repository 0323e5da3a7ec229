use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::email::{BatchOutcome, MailSource, Watermark};
use crate::error::TransportError;
use crate::live::DiscoveryPipeline;
use crate::sink::DiscoverySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No full scan has completed yet
    Initial,
    /// Incremental scans from the watermark
    Steady,
}

/// Long-running driver: one full scan of the label, then an incremental
/// scan from the watermark on every tick.
///
/// The watermark lives here and is only touched between batches.
pub struct PollLoop<M: MailSource> {
    source: M,
    pipeline: DiscoveryPipeline,
    sinks: Vec<Box<dyn DiscoverySink>>,
    label: String,
    poll_interval: Duration,
    phase: Phase,
    watermark: Watermark,
}

impl<M: MailSource> PollLoop<M> {
    pub fn new(source: M, pipeline: DiscoveryPipeline, label: impl Into<String>, poll_interval: Duration) -> Self {
        PollLoop {
            source,
            pipeline,
            sinks: Vec::new(),
            label: label.into(),
            poll_interval,
            phase: Phase::Initial,
            watermark: Watermark::default(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn DiscoverySink>) -> Self {
        info!("Discoveries will be published to {}", sink.sink_name());
        self.sinks.push(sink);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// One attempt at the full scan. On success the loop enters `Steady`.
    pub async fn bootstrap(&mut self) -> Result<BatchOutcome, TransportError> {
        info!("🔎 Full scan of label '{}'", self.label);

        // Messages can be modified while they are fetched, which moves their
        // revision; the watermark must not pass what the mailbox had at listing time.
        let ceiling = self.source.current_revision().await?;
        let notifications = self.source.list_by_label(&self.label).await?;
        let outcome = self.pipeline.process_batch(&notifications, Utc::now());
        self.emit(&outcome).await;

        let revision = match outcome.highest_revision {
            Some(revision) => revision.min(ceiling),
            None => {
                debug!("Nothing inspected, seeding watermark from the mailbox");
                ceiling
            }
        };
        self.watermark = Watermark::new(revision);
        self.phase = Phase::Steady;
        info!("📍 Watermark set to {}", revision);

        Ok(outcome)
    }

    /// One incremental scan from the current watermark
    pub async fn tick(&mut self) -> Result<BatchOutcome, TransportError> {
        let (notifications, observed) = self.source.list_since(&self.label, self.watermark).await?;

        if notifications.is_empty() {
            debug!("No new notification since revision {} (observed {})", self.watermark.revision(), observed);
            return Ok(BatchOutcome::new());
        }

        let outcome = self.pipeline.process_batch(&notifications, Utc::now());
        self.emit(&outcome).await;

        // Never move past the history the listing actually covered
        if let Some(revision) = outcome.highest_revision.map(|r| r.min(observed)) {
            let previous = self.watermark.revision();
            if self.watermark.advance(revision) {
                info!("📍 Watermark advanced from {} to {}", previous, revision);
            }
        }

        Ok(outcome)
    }

    /// Retry the full scan until it succeeds
    pub async fn run_bootstrap(&mut self) -> BatchOutcome {
        loop {
            match self.bootstrap().await {
                Ok(outcome) => return outcome,
                Err(e) => {
                    error!("❌ Full scan failed: {}", e);
                    warn!("⚠️  Retrying full scan");
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    /// Run forever: full scan, then one incremental scan per interval
    pub async fn run(mut self) {
        if self.phase == Phase::Initial {
            self.run_bootstrap().await;
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick (happens immediately)
        ticker.tick().await;

        info!("🔄 Polling every {}s", self.poll_interval.as_secs());

        loop {
            ticker.tick().await;

            if let Err(e) = self.tick().await {
                error!("❌ Incremental scan failed: {}", e);
                warn!("⚠️  Will retry at next interval");
            }
        }
    }

    async fn emit(&self, outcome: &BatchOutcome) {
        if outcome.discoveries.is_empty() {
            return;
        }

        for sink in &self.sinks {
            if let Err(e) = sink.publish(&outcome.discoveries).await {
                error!("❌ Unable to publish to {}: {}", sink.sink_name(), e);
            }
        }
    }
}
