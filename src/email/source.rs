use futures::future::BoxFuture;

use crate::error::TransportError;
use super::common::{Notification, Watermark};

/// Read-only access to the notifications filed under a mailbox label
pub trait MailSource: Send + Sync {
    /// Full listing of the messages currently carrying `label`, newest first
    fn list_by_label<'a>(
        &'a self,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Notification>, TransportError>>;

    /// Messages added to `label` after `watermark`, newest first, together
    /// with the highest revision observed (the watermark itself when nothing
    /// is new)
    fn list_since<'a>(
        &'a self,
        label: &'a str,
        watermark: Watermark,
    ) -> BoxFuture<'a, Result<(Vec<Notification>, u64), TransportError>>;

    /// Current revision of the whole mailbox
    fn current_revision(&self) -> BoxFuture<'_, Result<u64, TransportError>>;
}

impl<T: MailSource + ?Sized> MailSource for std::sync::Arc<T> {
    fn list_by_label<'a>(
        &'a self,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Notification>, TransportError>> {
        (**self).list_by_label(label)
    }

    fn list_since<'a>(
        &'a self,
        label: &'a str,
        watermark: Watermark,
    ) -> BoxFuture<'a, Result<(Vec<Notification>, u64), TransportError>> {
        (**self).list_since(label, watermark)
    }

    fn current_revision(&self) -> BoxFuture<'_, Result<u64, TransportError>> {
        (**self).current_revision()
    }
}
