/// Common structures shared by the mail source and the discovery pipeline
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One mail message under the watched label, as fetched from the service
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    pub received_at: DateTime<Utc>,
    /// RFC 822 message in URL-safe base64 transport encoding
    pub raw: String,
    /// Mailbox revision (Gmail history id) at which the message was seen
    pub revision: u64,
}

/// A video identifier recovered from a live notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub video_id: String,
    pub message_id: String,
    pub revision: u64,
}

impl Discovery {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Highest revision already incorporated into discovery.
///
/// Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(u64);

impl Watermark {
    pub fn new(revision: u64) -> Self {
        Watermark(revision)
    }

    pub fn revision(&self) -> u64 {
        self.0
    }

    /// Move to `revision` if it is ahead; returns whether anything changed.
    pub fn advance(&mut self, revision: u64) -> bool {
        if revision > self.0 {
            self.0 = revision;
            true
        } else {
            false
        }
    }
}

/// Aggregated result of one pass over a batch of notifications
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub discoveries: Vec<Discovery>,
    /// Highest revision across inspected notifications, `None` if none were
    pub highest_revision: Option<u64>,
    pub inspected: usize,
    pub skipped: usize,
    pub stopped_early: bool,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inspected(&mut self, revision: u64) {
        self.inspected += 1;
        self.highest_revision = Some(self.highest_revision.map_or(revision, |r| r.max(revision)));
    }

    pub fn success(&mut self, discovery: Discovery) {
        self.discoveries.push(discovery);
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn video_ids(&self) -> Vec<&str> {
        self.discoveries.iter().map(|d| d.video_id.as_str()).collect()
    }
}
