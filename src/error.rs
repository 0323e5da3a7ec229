use thiserror::Error;

/// Failure talking to the remote mail service.
///
/// Always transient from the poller's point of view: the current scan is
/// abandoned and retried at the next opportunity.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Gmail API request failed: {0}")]
    Api(#[from] google_gmail1::Error),

    #[error("Gmail response is missing field '{0}'")]
    MissingField(&'static str),

    #[error("mail service unavailable: {0}")]
    Unavailable(String),
}

/// Why a single notification did not yield a video identifier.
///
/// `Stale` is a control-flow signal that ends the current batch; every other
/// variant only skips the notification it was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("notification is {age_hours}h old, past the cutoff")]
    Stale { age_hours: i64 },

    #[error("not a live notification (subject: {subject:?})")]
    NotALive { subject: String },

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("no watch link found in HTML body")]
    LinkNotFound,

    #[error("invalid watch URL: {0}")]
    Url(String),

    #[error("watch URL carries no video identifier")]
    EmptyIdentifier,
}

impl DiscoveryError {
    pub fn is_stale(&self) -> bool {
        matches!(self, DiscoveryError::Stale { .. })
    }

    /// Skips that are part of normal operation and not worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, DiscoveryError::NotALive { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_is_the_only_batch_stopper() {
        assert!(DiscoveryError::Stale { age_hours: 14 }.is_stale());
        assert!(!DiscoveryError::LinkNotFound.is_stale());
        assert!(!DiscoveryError::NotALive { subject: "hi".into() }.is_stale());
        assert!(!DiscoveryError::EmptyIdentifier.is_stale());
    }

    #[test]
    fn test_expected_skips() {
        assert!(DiscoveryError::NotALive { subject: String::new() }.is_expected());
        assert!(!DiscoveryError::Stale { age_hours: 20 }.is_expected());
        assert!(!DiscoveryError::Payload("bad base64".into()).is_expected());
        assert!(!DiscoveryError::Url("relative URL without a base".into()).is_expected());
    }
}
