//! Per-subscriber event channel registry
//!
//! Maps a [`SubscriberId`] to at most one live [`EventSink`]. Delivery is
//! best-effort and non-blocking: sending to an identity with no channel is a
//! silent no-op, and a failing sink never affects delivery to any other.
//!
//! The registry is created once at process start, shared via `Arc` with every
//! component that pushes events, and cleared at shutdown.

use crate::error::DeliveryError;
use crate::types::SubscriberId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Capability to deliver one event to a live connection
///
/// Implementations must not block; the registry calls `deliver` from request
/// handlers and moderation workflows.
pub trait EventSink<E>: Send + Sync {
    /// Hand `event` to the underlying transport
    fn deliver(&self, event: &E) -> Result<(), DeliveryError>;
}

/// Bounded queue feeding a server-push stream
impl<E> EventSink<E> for mpsc::Sender<E>
where
    E: Clone + Send + Sync,
{
    fn deliver(&self, event: &E) -> Result<(), DeliveryError> {
        self.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Shared handle to a registered sink
pub type SharedSink<E> = Arc<dyn EventSink<E>>;

/// Identity-keyed registry of subscriber channels
pub struct ChannelRegistry<E> {
    channels: RwLock<HashMap<SubscriberId, SharedSink<E>>>,
}

impl<E> Default for ChannelRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ChannelRegistry<E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Install the channel for `id`, replacing any earlier one
    pub fn register(&self, id: SubscriberId, sink: SharedSink<E>) {
        let replaced = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), sink)
            .is_some();

        tracing::debug!(subscriber = %id, replaced, "subscriber channel registered");
    }

    /// Remove the channel for `id`, if any
    pub fn unregister(&self, id: &SubscriberId) {
        let removed = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();

        if removed {
            tracing::debug!(subscriber = %id, "subscriber channel unregistered");
        }
    }

    /// Remove the channel for `id` only if it is still `sink`
    ///
    /// A disconnecting connection uses this so it never tears down a newer
    /// channel that replaced it. Returns whether anything was removed.
    pub fn unregister_sink(&self, id: &SubscriberId, sink: &SharedSink<E>) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        match channels.get(id) {
            Some(current) if Arc::ptr_eq(current, sink) => {
                channels.remove(id);
                tracing::debug!(subscriber = %id, "subscriber channel closed");
                true
            }
            _ => false,
        }
    }

    /// Deliver `event` to the channel for `id`
    ///
    /// Returns whether the event was handed to a sink. A missing channel or a
    /// refusing sink is never an error for the caller.
    pub fn send_to(&self, id: &SubscriberId, event: &E) -> bool {
        // Clone the handle out so the lock is not held during delivery
        let sink = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();

        let Some(sink) = sink else {
            tracing::debug!(subscriber = %id, "no channel for subscriber, event dropped");
            return false;
        };

        self.deliver_to(id, &sink, event)
    }

    /// Deliver `event` to every registered channel, in no particular order
    ///
    /// Returns the number of channels that accepted the event.
    pub fn broadcast(&self, event: &E) -> usize {
        let snapshot: Vec<(SubscriberId, SharedSink<E>)> = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sink)| (id.clone(), sink.clone()))
            .collect();

        snapshot
            .iter()
            .filter(|(id, sink)| self.deliver_to(id, sink, event))
            .count()
    }

    /// Whether a channel is registered for `id`
    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no channel is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every channel (used at shutdown)
    pub fn clear(&self) {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let count = channels.len();
        channels.clear();
        tracing::info!(count, "subscriber channels cleared");
    }

    fn deliver_to(&self, id: &SubscriberId, sink: &SharedSink<E>, event: &E) -> bool {
        match sink.deliver(event) {
            Ok(()) => true,
            Err(DeliveryError::Full) => {
                tracing::warn!(subscriber = %id, "subscriber is not keeping up, event dropped");
                false
            }
            Err(DeliveryError::Closed) => {
                tracing::debug!(subscriber = %id, "subscriber channel closed, removing");
                self.unregister_sink(id, sink);
                false
            }
        }
    }
}
