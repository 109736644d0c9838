//! Per-object change signals.
//!
//! The distributor never carries object state, only "object N changed at
//! version V". Subscribers refetch the full state themselves, so a lagging
//! subscriber can always recover by reading again.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use common::model::ObjectId;

pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 64;
/// Version signalled when an object is destroyed. Sorts after every real version.
pub const DESTROYED: u64 = u64::MAX;

type Registry = Arc<Mutex<HashMap<ObjectId, broadcast::Sender<u64>>>>;

/// Registry of per-object broadcast channels.
///
/// Channels are created on first subscribe and removed when their last
/// [`Subscription`] is dropped. The lock is only held for map access.
#[derive(Debug, Clone)]
pub struct ChangeDistributor {
    channels: Registry,
    capacity: usize,
}

/// What a subscriber learns on each wakeup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The object was accepted at this version (or destroyed, when it no longer reads)
    Changed(u64),
    /// Signals were dropped because this subscriber fell behind; refetch
    Lagged,
    /// The channel is gone
    Closed,
}

impl ChangeDistributor {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, id: &ObjectId) -> Subscription {
        let receiver = {
            let mut channels = self.channels.lock();
            channels
                .entry(id.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        tracing::debug!(object_id = %id, "subscribed to object changes");

        Subscription {
            id: id.clone(),
            receiver: Some(receiver),
            channels: self.channels.clone(),
        }
    }

    /// Signal every subscriber of `id`. Returns how many were signalled.
    pub fn publish(&self, id: &ObjectId, version: u64) -> usize {
        let channels = self.channels.lock();
        match channels.get(id) {
            Some(sender) => sender.send(version).unwrap_or(0),
            None => 0,
        }
    }

    /// Tell subscribers the object is gone so their streams can close
    pub fn publish_destroyed(&self, id: &ObjectId) -> usize {
        self.publish(id, DESTROYED)
    }

    pub fn subscriber_count(&self, id: &ObjectId) -> usize {
        self.channels
            .lock()
            .get(id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of objects with at least one subscriber
    pub fn watched_objects(&self) -> usize {
        self.channels.lock().len()
    }
}

impl Default for ChangeDistributor {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIPTION_CAPACITY)
    }
}

/// A live registration for one object. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: ObjectId,
    receiver: Option<broadcast::Receiver<u64>>,
    channels: Registry,
}

impl Subscription {
    pub fn object_id(&self) -> &ObjectId {
        &self.id
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Signal {
        let Some(receiver) = self.receiver.as_mut() else {
            return Signal::Closed;
        };

        match receiver.recv().await {
            Ok(version) => Signal::Changed(version),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(object_id = %self.id, skipped, "subscriber lagged");
                Signal::Lagged
            }
            Err(broadcast::error::RecvError::Closed) => Signal::Closed,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // release our receiver before counting what is left
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        drop(receiver);

        let mut channels = self.channels.lock();
        let unused = channels
            .get(&self.id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if unused {
            channels.remove(&self.id);
            tracing::debug!(object_id = %self.id, "last subscriber left, channel pruned");
        }
    }
}
