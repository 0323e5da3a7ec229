use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::error::TransportError;
use super::common::{Notification, Watermark};
use super::source::MailSource;

#[derive(Default)]
struct Mailbox {
    labelled: Vec<(String, Notification)>,
    failures_left: usize,
    calls: Vec<String>,
}

/// Mail source kept entirely in memory.
///
/// Exists for the integration tests under `tests/` and for driving the
/// poller without a Gmail account. It is not wired into the binary.
/// Listings are ordered by arrival time, not by Gmail history order.
#[derive(Default)]
pub struct InMemoryMailSource {
    mailbox: Mutex<Mailbox>,
}

impl InMemoryMailSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a notification under `label`
    pub fn deliver(&self, label: &str, notification: Notification) {
        let mut mailbox = self.lock();
        mailbox.labelled.push((label.to_string(), notification));
    }

    /// Make the next `count` calls fail with a transport error
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_left = count;
    }

    /// Names of the operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, call: &str) -> Result<std::sync::MutexGuard<'_, Mailbox>, TransportError> {
        let mut mailbox = self.lock();
        mailbox.calls.push(call.to_string());
        if mailbox.failures_left > 0 {
            mailbox.failures_left -= 1;
            return Err(TransportError::Unavailable(format!("{} failed", call)));
        }
        Ok(mailbox)
    }

    fn newest_first(mailbox: &Mailbox, label: &str, after: u64) -> Vec<Notification> {
        let mut found: Vec<Notification> = mailbox
            .labelled
            .iter()
            .filter(|(l, n)| l == label && n.revision > after)
            .map(|(_, n)| n.clone())
            .collect();
        found.sort_by(|a, b| b.received_at.cmp(&a.received_at).then(b.revision.cmp(&a.revision)));
        found
    }
}

impl MailSource for InMemoryMailSource {
    fn list_by_label<'a>(
        &'a self,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Notification>, TransportError>> {
        Box::pin(async move {
            let mailbox = self.begin("list_by_label")?;
            Ok(Self::newest_first(&mailbox, label, 0))
        })
    }

    fn list_since<'a>(
        &'a self,
        label: &'a str,
        watermark: Watermark,
    ) -> BoxFuture<'a, Result<(Vec<Notification>, u64), TransportError>> {
        Box::pin(async move {
            let mailbox = self.begin("list_since")?;
            let found = Self::newest_first(&mailbox, label, watermark.revision());
            let highest = found
                .iter()
                .map(|n| n.revision)
                .max()
                .unwrap_or(watermark.revision());
            Ok((found, highest))
        })
    }

    fn current_revision(&self) -> BoxFuture<'_, Result<u64, TransportError>> {
        Box::pin(async move {
            let mailbox = self.begin("current_revision")?;
            Ok(mailbox.labelled.iter().map(|(_, n)| n.revision).max().unwrap_or(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn notification(id: &str, revision: u64, hours_ago: i64) -> Notification {
        Notification {
            id: id.to_string(),
            received_at: Utc::now() - Duration::hours(hours_ago),
            raw: String::new(),
            revision,
        }
    }

    #[tokio::test]
    async fn test_lists_newest_first_and_filters_by_label() {
        let source = InMemoryMailSource::new();
        source.deliver("social", notification("old", 1, 5));
        source.deliver("social", notification("new", 2, 1));
        source.deliver("inbox", notification("other", 3, 0));

        let listed = source.list_by_label("social").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_list_since_keeps_watermark_when_nothing_new() {
        let source = InMemoryMailSource::new();
        source.deliver("social", notification("a", 7, 1));

        let (found, highest) = source.list_since("social", Watermark::new(7)).await.unwrap();
        assert!(found.is_empty());
        assert_eq!(highest, 7);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let source = InMemoryMailSource::new();
        source.fail_next(1);
        assert!(source.list_by_label("social").await.is_err());
        assert!(source.list_by_label("social").await.is_ok());
    }
}
