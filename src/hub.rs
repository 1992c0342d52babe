//! In-process fan-out of events to connected subscribers.
//!
//! Each subscriber owns an unbounded channel; the socket task on the other end
//! drains it. Broadcasting walks every registered sender, so a new batch
//! reaches everyone connected at that moment, while [`Publisher::publish_to_one`]
//! targets a single subscriber and nobody else.

use crate::error::PublishError;
use crate::models::{Batch, ServerEvent};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

pub type SubscriberId = u64;

/// Broadcast boundary used by the scheduler and the handshake.
pub trait Publisher: Send + Sync {
    /// Send `batch` to every connected subscriber. Returns how many received it.
    fn publish_to_all(&self, batch: &Batch) -> impl Future<Output = usize> + Send;

    /// Send `event` to one subscriber only.
    fn publish_to_one(
        &self,
        id: SubscriberId,
        event: ServerEvent,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Thread-safe, cloneable registry of subscriber channels.
#[derive(Clone, Default)]
pub struct SubscriberHub {
    next_id: Arc<AtomicU64>,
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and hand back its id and event stream.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.insert(id, tx);
        info!(subscriber = id, "Client is connected to the server");
        (id, rx)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.write().await.remove(&id).is_some() {
            info!(subscriber = id, "Client disconnected");
        }
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Publisher for SubscriberHub {
    async fn publish_to_all(&self, batch: &Batch) -> usize {
        let event = ServerEvent::NewStories {
            stories: batch.clone(),
        };

        let mut dead = Vec::new();
        let mut delivered = 0;
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                match tx.send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(_) => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &dead {
                subscribers.remove(id);
            }
            debug!(pruned = dead.len(), "Pruned closed subscribers");
        }

        info!(delivered, stories = batch.len(), "Broadcast stories");
        delivered
    }

    async fn publish_to_one(
        &self,
        id: SubscriberId,
        event: ServerEvent,
    ) -> Result<(), PublishError> {
        let sent = {
            let subscribers = self.subscribers.read().await;
            let tx = subscribers.get(&id).ok_or(PublishError::UnknownSubscriber(id))?;
            tx.send(event).is_ok()
        };
        if sent {
            Ok(())
        } else {
            self.unsubscribe(id).await;
            Err(PublishError::Disconnected(id))
        }
    }
}
