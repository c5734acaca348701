use crate::progress::ProgressEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

/// Events buffered per subscriber before new ones are dropped for it
const SUBSCRIBER_CAPACITY: usize = 256;

/// How long a terminal event waits for room in a full subscriber queue
const TERMINAL_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle identifying one subscriber
pub type SubscriberId = u64;

/// A live subscription: serialized events arrive on `receiver` in emit order
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<String>,
}

/// Fan-out of progress events to any number of subscribers
///
/// Thread-safe, cloneable. Each subscriber owns a bounded queue; a closed or
/// full queue only affects that subscriber.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::Sender<String>>>>,
    next_id: Arc<AtomicU64>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber
    pub async fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.write().await.insert(id, tx);
        tracing::debug!("Progress subscriber {} connected", id);
        Subscription { id, receiver }
    }

    /// Removes a subscriber; unknown ids are ignored
    pub async fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.write().await.remove(&id).is_some() {
            tracing::debug!("Progress subscriber {} disconnected", id);
        }
    }

    /// Delivers `event` to every current subscriber
    ///
    /// The event is serialized once. A progress event is dropped for a
    /// subscriber whose queue is full; a completed or error event waits up to
    /// `TERMINAL_SEND_TIMEOUT` for room instead. A failed delivery is logged
    /// and skipped without affecting the others.
    ///
    /// # Returns
    ///
    /// The number of subscribers the event was delivered to
    pub async fn broadcast(&self, event: &ProgressEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize progress event: {}", e);
                return 0;
            }
        };

        let subscribers = self.subscribers.read().await;
        let mut delivered = 0;
        for (id, tx) in subscribers.iter() {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(payload)) if event.is_terminal() => {
                    match tokio::time::timeout(TERMINAL_SEND_TIMEOUT, tx.send(payload)).await {
                        Ok(Ok(())) => delivered += 1,
                        Ok(Err(_)) => {
                            tracing::debug!("Progress subscriber {} went away", id)
                        }
                        Err(_) => tracing::warn!(
                            "Progress subscriber {} stalled; final event dropped",
                            id
                        ),
                    }
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Progress subscriber {} is lagging; event dropped", id)
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("Progress subscriber {} went away", id)
                }
            }
        }
        delivered
    }
}
