//! Channel name → handler map.
//!
//! Decouples "who currently wants data from channel X" from both the
//! transport's connection lifecycle and the router's dispatch loop. The
//! registry is mutated only by explicit [`ChannelRegistry::subscribe`] /
//! [`ChannelRegistry::unsubscribe`] calls — never by transport events — so
//! subscriptions survive disconnect/reconnect cycles unchanged.
//!
//! Each channel has at most one handler. Subscribing twice to the same
//! name silently replaces the first handler; messages dispatched after the
//! second subscribe reach only the second handler.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use parking_lot::Mutex;
use tracing::{debug, error, trace};

/// Callback invoked with a dispatched message's payload fields.
pub type Handler = Box<dyn FnMut(Vec<String>) + Send>;

/// Registry of currently-active channel subscriptions.
///
/// Backed by a sharded concurrent map, so subscribe/unsubscribe on
/// *different* channel names never contend structurally. Handlers are held
/// behind their own mutex and the map shard is released before a handler
/// runs, so a handler may subscribe or unsubscribe — including removing
/// itself — from inside a dispatch.
pub struct ChannelRegistry {
    channels: DashMap<String, Arc<Mutex<Handler>>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Register `handler` as the sole recipient for `channel`.
    ///
    /// Overwrites any existing handler for that name.
    pub fn subscribe(&self, channel: impl Into<String>, handler: Handler) {
        let channel = channel.into();
        let replaced = self
            .channels
            .insert(channel.clone(), Arc::new(Mutex::new(handler)))
            .is_some();
        debug!(%channel, replaced, "subscribed");
    }

    /// Remove the handler for `channel`, if present. No-op when absent.
    pub fn unsubscribe(&self, channel: &str) {
        if self.channels.remove(channel).is_some() {
            debug!(channel, "unsubscribed");
        }
    }

    /// Deliver `fields` to the current handler for `channel`.
    ///
    /// Messages for unsubscribed channels are silently dropped — the
    /// server may keep publishing a stream nobody is listening to, and the
    /// cost of that is a map lookup, not a queue buildup. A panicking
    /// handler is caught and logged so it cannot break delivery on other
    /// channels sharing the router.
    pub fn dispatch(&self, channel: &str, fields: Vec<String>) {
        let Some(handler) = self
            .channels
            .get(channel)
            .map(|entry| Arc::clone(entry.value()))
        else {
            trace!(channel, "no handler registered, dropping message");
            counter!("link_unrouted_messages_total").increment(1);
            return;
        };

        let mut guard = handler.lock();
        let handler_fn: &mut Handler = &mut guard;
        if catch_unwind(AssertUnwindSafe(|| handler_fn(fields))).is_err() {
            counter!("link_handler_panics_total").increment(1);
            error!(channel, "channel handler panicked, message dropped");
        }
    }

    /// Whether `channel` currently has a handler.
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no subscriptions are active.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
