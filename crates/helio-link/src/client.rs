//! The `TelemetryClient` facade.
//!
//! This is the entire surface a consumer holds: subscribe/unsubscribe,
//! outbound send, and a connection-status observable. The client is handed
//! to whichever component needs it — there is no ambient global to reach
//! the registry through.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use helio_core::reconnect::ReconnectPolicy;
use helio_core::telemetry::TelemetryUpdate;

use crate::config::DeviceConfig;
use crate::errors::TransportError;
use crate::registry::{ChannelRegistry, Handler};
use crate::router::FrameRouter;
use crate::throttle::Throttle;
use crate::transport::{ConnectionState, Transport};

/// Handle to the device's multiplexed telemetry streams.
///
/// Cheap to clone; clones share the same connection and registry.
#[derive(Clone)]
pub struct TelemetryClient {
    registry: Arc<ChannelRegistry>,
    transport: Arc<Transport>,
}

impl TelemetryClient {
    /// Client with the default reconnect policy.
    pub fn new() -> Self {
        Self::with_policy(ReconnectPolicy::default())
    }

    /// Client with an explicit reconnect policy.
    pub fn with_policy(policy: ReconnectPolicy) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let router = Arc::new(FrameRouter::new(Arc::clone(&registry)));
        let transport = Arc::new(Transport::new(router, policy));
        Self { registry, transport }
    }

    /// Open (or move) the device connection.
    ///
    /// Idempotent for an unchanged address; a changed address tears the
    /// old connection down first. Subscriptions are unaffected either way.
    pub fn connect(&self, config: &DeviceConfig) {
        self.transport.connect(&config.ws_url());
    }

    /// Tear the connection down. Subscriptions stay registered and resume
    /// receiving on the next `connect`.
    pub fn close(&self) {
        self.transport.close();
    }

    /// Register `handler` as the sole recipient for `channel`.
    pub fn subscribe(&self, channel: impl Into<String>, handler: Handler) {
        self.registry.subscribe(channel, handler);
    }

    /// Register a handler wrapped in a sampling/debounce policy.
    pub fn subscribe_with(&self, channel: impl Into<String>, throttle: Throttle, handler: Handler) {
        self.registry.subscribe(channel, throttle.wrap(handler));
    }

    /// Register a typed handler: payloads are decoded to
    /// [`TelemetryUpdate`] before delivery. Payloads that fail to decode
    /// are logged and dropped.
    pub fn subscribe_updates(
        &self,
        channel: impl Into<String>,
        mut on_update: impl FnMut(TelemetryUpdate) + Send + 'static,
    ) {
        let channel = channel.into();
        let decode_channel = channel.clone();
        self.registry.subscribe(
            channel,
            Box::new(move |fields| match TelemetryUpdate::parse(&decode_channel, &fields) {
                Ok(update) => on_update(update),
                Err(error) => {
                    warn!(channel = %decode_channel, %error, "dropping undecodable payload");
                }
            }),
        );
    }

    /// Register a one-shot handler: it fires for the first message on
    /// `channel` and the subscription is removed from inside that dispatch.
    ///
    /// Used for `scan_process_<hash>` completion notifications.
    pub fn subscribe_once(
        &self,
        channel: impl Into<String>,
        once: impl FnOnce(Vec<String>) + Send + 'static,
    ) {
        let channel = channel.into();
        let registry = Arc::clone(&self.registry);
        let own_channel = channel.clone();
        let mut once = Some(once);
        self.registry.subscribe(
            channel,
            Box::new(move |fields| {
                if let Some(fire) = once.take() {
                    fire(fields);
                }
                registry.unsubscribe(&own_channel);
            }),
        );
    }

    /// Remove the handler for `channel`, if present.
    pub fn unsubscribe(&self, channel: &str) {
        self.registry.unsubscribe(channel);
    }

    /// Queue an outbound text frame to the device.
    pub fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.transport.send(text)
    }

    /// Watch connection-state transitions (the UI's status indicator).
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.watch_state()
    }

    /// Whether the device connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// The registry backing this client.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }
}

impl Default for TelemetryClient {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::channels;
    use parking_lot::Mutex;

    fn payload(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn subscribe_and_dispatch_through_registry() {
        let client = TelemetryClient::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        client.subscribe("camera", Box::new(move |fields| seen2.lock().push(fields)));

        client.registry().dispatch("camera", payload(&["f.jpg"]));

        assert_eq!(seen.lock().as_slice(), &[payload(&["f.jpg"])]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let client = TelemetryClient::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        client.subscribe("adu", Box::new(move |fields| seen2.lock().push(fields)));
        client.unsubscribe("adu");

        client.registry().dispatch("adu", payload(&["1", "2", "3"]));

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn one_shot_fires_exactly_once_then_is_gone() {
        let client = TelemetryClient::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let channel = channels::scan_process_channel("deadbeef");
        client.subscribe_once(channel.clone(), move |fields| seen2.lock().push(fields));

        client.registry().dispatch(&channel, payload(&["completed"]));
        client.registry().dispatch(&channel, payload(&["completed_again"]));

        assert_eq!(seen.lock().as_slice(), &[payload(&["completed"])]);
        assert!(!client.registry().contains(&channel));
    }

    #[test]
    fn typed_subscription_decodes_payloads() {
        let client = TelemetryClient::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        client.subscribe_updates("adu", move |update| seen2.lock().push(update));

        client.registry().dispatch("adu", payload(&["120", "80", "60"]));

        assert_eq!(
            seen.lock().as_slice(),
            &[TelemetryUpdate::PixelStats { r: 120, g: 80, b: 60 }]
        );
    }

    #[test]
    fn typed_subscription_drops_undecodable_payloads() {
        let client = TelemetryClient::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        client.subscribe_updates("focus", move |update| seen2.lock().push(update));

        client.registry().dispatch("focus", payload(&["not_a_number"]));
        client.registry().dispatch("focus", payload(&["873"]));

        // Only the good payload got through.
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn throttled_subscription_samples() {
        let client = TelemetryClient::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        client.subscribe_with(
            "adu",
            Throttle::every(5),
            Box::new(move |fields| seen2.lock().push(fields)),
        );

        for i in 1..=10 {
            client.registry().dispatch("adu", payload(&[&i.to_string()]));
        }

        assert_eq!(seen.lock().as_slice(), &[payload(&["5"]), payload(&["10"])]);
    }

    #[test]
    fn clones_share_the_registry() {
        let client = TelemetryClient::new();
        let clone = client.clone();
        clone.subscribe("spectrum", Box::new(|_| {}));
        assert!(client.registry().contains("spectrum"));
    }

    #[test]
    fn send_without_connection_is_an_error() {
        let client = TelemetryClient::new();
        assert_matches::assert_matches!(client.send("hello"), Err(TransportError::NotConnected));
    }
}
