use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::email::{BatchOutcome, Discovery, Notification};
use crate::error::DiscoveryError;
use super::decoder::NotificationDecoder;
use super::links::find_watch_link;
use super::video_id::extract_video_id;

pub type DiscoveryResult = Result<Discovery, DiscoveryError>;

/// Live archives stay up for at most 12 hours; one more hour of margin.
pub const DEFAULT_STALE_AFTER_HOURS: i64 = 13;

/// Turns notifications into video identifiers
pub struct DiscoveryPipeline {
    decoder: NotificationDecoder,
    stale_after: Duration,
}

impl Default for DiscoveryPipeline {
    fn default() -> Self {
        Self::new(NotificationDecoder::default(), Duration::hours(DEFAULT_STALE_AFTER_HOURS))
    }
}

impl DiscoveryPipeline {
    pub fn new(decoder: NotificationDecoder, stale_after: Duration) -> Self {
        DiscoveryPipeline { decoder, stale_after }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(
            NotificationDecoder::new(config.live_marker.clone()),
            Duration::hours(config.stale_cutoff_hours),
        )
    }

    /// Process a single notification as of `now`
    pub fn process(&self, notification: &Notification, now: DateTime<Utc>) -> DiscoveryResult {
        debug!("Processing notification {} (received {})", notification.id, notification.received_at);

        // 1. Time window
        let age = now - notification.received_at;
        if age > self.stale_after {
            return Err(DiscoveryError::Stale { age_hours: age.num_hours() });
        }

        // 2. MIME envelope and subject
        let envelope = self.decoder.decode(&notification.raw)?;

        // 3. Watch link
        let link = find_watch_link(&envelope.html).ok_or(DiscoveryError::LinkNotFound)?;

        // 4. Video identifier
        let video_id = extract_video_id(&link)?;
        if video_id.is_empty() {
            return Err(DiscoveryError::EmptyIdentifier);
        }

        Ok(Discovery {
            video_id,
            message_id: notification.id.clone(),
            revision: notification.revision,
        })
    }

    /// Process notifications in listing order (newest first).
    ///
    /// The first stale notification ends the batch; it and everything after
    /// it are neither inspected nor counted toward the highest revision.
    pub fn process_batch(&self, notifications: &[Notification], now: DateTime<Utc>) -> BatchOutcome {
        let mut outcome = BatchOutcome::new();

        for notification in notifications {
            match self.process(notification, now) {
                Err(e) if e.is_stale() => {
                    info!("⏹️  Stopping batch at {}: {}", notification.id, e);
                    outcome.stopped_early = true;
                    break;
                }
                Ok(discovery) => {
                    outcome.inspected(notification.revision);
                    info!("🔴 Live stream discovered: {} (message {})", discovery.video_id, notification.id);
                    outcome.success(discovery);
                }
                Err(e) => {
                    outcome.inspected(notification.revision);
                    outcome.skip();
                    if e.is_expected() {
                        info!("Skipping {}: {}", notification.id, e);
                    } else {
                        warn!("⚠️  Skipping {}: {}", notification.id, e);
                    }
                }
            }
        }

        info!(
            "Batch completed: {} inspected, {} discovered, {} skipped{}",
            outcome.inspected,
            outcome.discoveries.len(),
            outcome.skipped,
            if outcome.stopped_early { ", stopped at cutoff" } else { "" }
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine as _;

    fn live_email(video_id: &str) -> String {
        let html = format!(
            "<a href=\"https://www.youtube.com/redirect?u=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3D{}\">Watch</a>",
            video_id
        );
        let email = format!(
            "Subject: Channel ライブ配信中です\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n{}\r\n",
            html
        );
        URL_SAFE.encode(email)
    }

    fn notification(id: &str, revision: u64, hours_ago: i64, raw: String, now: DateTime<Utc>) -> Notification {
        Notification {
            id: id.to_string(),
            received_at: now - Duration::hours(hours_ago),
            raw,
            revision,
        }
    }

    #[test]
    fn test_process_live_notification() {
        let now = Utc::now();
        let n = notification("m1", 10, 1, live_email("XYZ"), now);

        let discovery = DiscoveryPipeline::default().process(&n, now).unwrap();
        assert_eq!(discovery.video_id, "XYZ");
        assert_eq!(discovery.revision, 10);
    }

    #[test]
    fn test_stale_boundary() {
        let now = Utc::now();
        let pipeline = DiscoveryPipeline::default();

        let at_cutoff = notification("edge", 1, 13, live_email("EDGE"), now);
        assert!(pipeline.process(&at_cutoff, now).is_ok());

        let past_cutoff = Notification {
            received_at: now - Duration::hours(13) - Duration::seconds(1),
            ..at_cutoff
        };
        assert!(pipeline.process(&past_cutoff, now).unwrap_err().is_stale());
    }

    #[test]
    fn test_missing_link_is_a_skip() {
        let now = Utc::now();
        let email = "Subject: ライブ配信中です\r\nContent-Type: text/html\r\n\r\n<p>no links</p>\r\n";
        let n = notification("m1", 3, 0, URL_SAFE.encode(email), now);

        assert_eq!(DiscoveryPipeline::default().process(&n, now), Err(DiscoveryError::LinkNotFound));
    }

    #[test]
    fn test_empty_identifier_is_a_skip() {
        let now = Utc::now();
        let email = "Subject: ライブ配信中です\r\nContent-Type: text/html\r\n\r\n\
<a href=\"https://www.youtube.com/redirect?u=https%3A%2F%2Fwww.youtube.com%2Fwatch\">Watch</a>\r\n";
        let n = notification("m1", 3, 0, URL_SAFE.encode(email), now);

        assert_eq!(DiscoveryPipeline::default().process(&n, now), Err(DiscoveryError::EmptyIdentifier));
    }

    #[test]
    fn test_batch_stops_at_first_stale_notification() {
        let now = Utc::now();
        let batch = vec![
            notification("a", 30, 1, live_email("A"), now),
            notification("b", 20, 14, live_email("B"), now),
            notification("c", 40, 2, live_email("C"), now),
        ];

        let outcome = DiscoveryPipeline::default().process_batch(&batch, now);
        assert_eq!(outcome.video_ids(), vec!["A"]);
        assert_eq!(outcome.inspected, 1);
        assert_eq!(outcome.highest_revision, Some(30));
        assert!(outcome.stopped_early);
    }

    #[test]
    fn test_batch_continues_past_bad_notifications() {
        let now = Utc::now();
        let batch = vec![
            notification("bad", 5, 0, "%%%".to_string(), now),
            notification("good", 4, 0, live_email("OK"), now),
        ];

        let outcome = DiscoveryPipeline::default().process_batch(&batch, now);
        assert_eq!(outcome.video_ids(), vec!["OK"]);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.highest_revision, Some(5));
        assert!(!outcome.stopped_early);
    }

    #[test]
    fn test_empty_batch() {
        let outcome = DiscoveryPipeline::default().process_batch(&[], Utc::now());
        assert!(outcome.discoveries.is_empty());
        assert_eq!(outcome.highest_revision, None);
    }
}
