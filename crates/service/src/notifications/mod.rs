//! Outbound order status notifications.
//!
//! Status changes are committed first and published afterwards. Publishing
//! puts the event on a bounded in-memory queue and returns immediately; a
//! single background worker drains the queue and hands each event to a
//! [`Notifier`]. A full queue or a failed delivery is logged and the event is
//! dropped; neither affects the request that caused it.

mod email;
mod logging;

pub use email::EmailNotifier;
pub use logging::LogNotifier;

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ordering_core::notification::StatusChangeEvent;

/// Errors a notifier can report.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// Any other delivery failure.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers status change events to buyers.
pub trait Notifier: Send + Sync + 'static {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the event could not be delivered. The
    /// worker logs the error and moves on to the next event.
    fn deliver(
        &self,
        event: &StatusChangeEvent,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Handle for publishing events to the notification worker.
///
/// Cheap to clone. The worker stops once every handle has been dropped and
/// the queue is drained.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<StatusChangeEvent>,
}

impl NotificationQueue {
    /// Spawn the worker and return the publishing handle.
    ///
    /// A `capacity` of zero is treated as one.
    #[must_use]
    pub fn start<N: Notifier>(notifier: N, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        info!(capacity, "Starting notification worker");
        let worker = tokio::spawn(run_worker(notifier, receiver));
        (Self { sender }, worker)
    }

    /// Queue an event without waiting.
    ///
    /// Returns `false` if the event was dropped because the queue is full or
    /// the worker has stopped.
    pub fn publish(&self, event: StatusChangeEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    order_id = %event.order_id,
                    new_status = %event.new_status,
                    "Notification queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                error!(
                    order_id = %event.order_id,
                    new_status = %event.new_status,
                    "Notification worker stopped, dropping event"
                );
                false
            }
        }
    }
}

async fn run_worker<N: Notifier>(notifier: N, mut receiver: mpsc::Receiver<StatusChangeEvent>) {
    while let Some(event) = receiver.recv().await {
        match notifier.deliver(&event).await {
            Ok(()) => debug!(
                order_id = %event.order_id,
                previous_status = %event.previous_status,
                new_status = %event.new_status,
                "Notification delivered"
            ),
            Err(e) => error!(
                error = %e,
                order_id = %event.order_id,
                new_status = %event.new_status,
                "Failed to deliver notification"
            ),
        }
    }
    info!("Notification worker stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::Semaphore;

    use ordering_core::{OrderId, OrderStatus};

    use super::*;

    fn event(order: i32, previous: OrderStatus, new: OrderStatus) -> StatusChangeEvent {
        StatusChangeEvent {
            order_id: OrderId::new(order),
            previous_status: previous,
            new_status: new,
            buyer_email: "buyer@example.com".to_string(),
        }
    }

    #[derive(Clone, Default)]
    struct Recording {
        delivered: Arc<Mutex<Vec<StatusChangeEvent>>>,
        fail_orders: Vec<i32>,
    }

    impl Notifier for Recording {
        async fn deliver(&self, event: &StatusChangeEvent) -> Result<(), NotificationError> {
            if self.fail_orders.contains(&event.order_id.as_i32()) {
                return Err(NotificationError::Delivery("mailbox unavailable".to_string()));
            }
            self.delivered.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Gated {
        gate: Arc<Semaphore>,
    }

    impl Notifier for Gated {
        async fn deliver(&self, _event: &StatusChangeEvent) -> Result<(), NotificationError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| NotificationError::Delivery(e.to_string()))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let notifier = Recording::default();
        let delivered = Arc::clone(&notifier.delivered);
        let (queue, worker) = NotificationQueue::start(notifier, 8);

        assert!(queue.publish(event(1, OrderStatus::New, OrderStatus::Confirmed)));
        assert!(queue.publish(event(1, OrderStatus::Confirmed, OrderStatus::Assembled)));
        drop(queue);
        worker.await.unwrap();

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].previous_status, OrderStatus::New);
        assert_eq!(delivered[0].new_status, OrderStatus::Confirmed);
        assert_eq!(delivered[1].new_status, OrderStatus::Assembled);
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_the_worker() {
        let notifier = Recording {
            fail_orders: vec![1],
            ..Recording::default()
        };
        let delivered = Arc::clone(&notifier.delivered);
        let (queue, worker) = NotificationQueue::start(notifier, 8);

        assert!(queue.publish(event(1, OrderStatus::New, OrderStatus::Confirmed)));
        assert!(queue.publish(event(2, OrderStatus::New, OrderStatus::Canceled)));
        drop(queue);
        worker.await.unwrap();

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].order_id, OrderId::new(2));
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let gate = Arc::new(Semaphore::new(0));
        let (queue, worker) = NotificationQueue::start(
            Gated {
                gate: Arc::clone(&gate),
            },
            1,
        );

        // One event can be in flight and one buffered; the rest are dropped.
        let accepted = (1..=10)
            .filter(|i| queue.publish(event(*i, OrderStatus::New, OrderStatus::Confirmed)))
            .count();
        assert!(accepted >= 1);
        assert!(accepted <= 2);

        gate.add_permits(10);
        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_after_worker_stopped_is_dropped() {
        let (queue, worker) = NotificationQueue::start(Recording::default(), 1);
        worker.abort();
        let _ = worker.await;

        assert!(!queue.publish(event(1, OrderStatus::Basket, OrderStatus::New)));
    }
}
