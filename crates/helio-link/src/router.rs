//! Inbound frame routing.
//!
//! Turns each raw text frame into a registry dispatch. The router is called
//! from the transport's single read loop, so dispatch is synchronous and
//! strictly in arrival order; a handler is never preempted by the next
//! frame.

use std::sync::Arc;

use helio_core::frame::RawFrame;
use metrics::counter;
use tracing::{trace, warn};

use crate::registry::ChannelRegistry;

/// Parses raw frames and dispatches them through the registry.
pub struct FrameRouter {
    registry: Arc<ChannelRegistry>,
}

impl FrameRouter {
    /// Create a router dispatching into `registry`.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this router dispatches into.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Route one raw inbound frame.
    ///
    /// Malformed frames (no delimiter) are logged and discarded; they never
    /// reach the registry and never propagate an error upward.
    pub fn route(&self, raw: &str) {
        match RawFrame::parse(raw) {
            Ok(frame) => {
                trace!(channel = %frame.channel, fields = frame.fields.len(), "inbound frame");
                self.registry.dispatch(&frame.channel, frame.fields);
            }
            Err(error) => {
                counter!("link_malformed_frames_total").increment(1);
                warn!(%error, "dropping malformed frame");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
