//! Notifier that only writes to the log.

use tracing::info;

use ordering_core::notification::StatusChangeEvent;

use super::{NotificationError, Notifier};

/// Logs each event. Used when no SMTP server is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, event: &StatusChangeEvent) -> Result<(), NotificationError> {
        info!(
            order_id = %event.order_id,
            previous_status = %event.previous_status,
            new_status = %event.new_status,
            to = %event.buyer_email,
            "Order status changed"
        );
        Ok(())
    }
}
