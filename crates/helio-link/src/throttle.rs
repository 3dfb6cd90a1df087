//! Sampling and debounce policies for channel handlers.
//!
//! The device pushes some streams far faster than a UI can usefully
//! consume them. [`Throttle`] wraps a [`Handler`] before registration so
//! the expensive work runs at a bounded rate:
//!
//! - **Sampling stride**: forward only every Nth message. By default the
//!   wrapper counts its own invocations; with [`Throttle::with_counter`]
//!   it samples against a shared [`FrameCounter`] incremented on a
//!   reference channel (the live-frame stream), so secondary streams
//!   update in lockstep with the primary one.
//! - **Trailing-edge debounce**: coalesce a burst of forwarded values into
//!   the last one, delivered only after a quiet period.
//!
//! Sampling applies before debouncing: messages the stride discards do not
//! reset the quiet period.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::error;

use crate::registry::Handler;

/// Shared monotone message counter for a reference channel.
///
/// Clones share the same underlying counter.
#[derive(Clone, Debug, Default)]
pub struct FrameCounter(Arc<AtomicU64>);

impl FrameCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Wrap `handler` so every invocation increments this counter first.
    ///
    /// Registered on the reference channel (typically the live frame
    /// stream) that secondary channels sample against.
    pub fn counting(&self, mut handler: Handler) -> Handler {
        let counter = self.clone();
        Box::new(move |fields| {
            let _ = counter.increment();
            handler(fields);
        })
    }
}

/// A sampling/debounce policy applied to one channel's handler.
///
/// The default policy (`stride` 1, no debounce) forwards everything.
#[derive(Clone, Debug, Default)]
pub struct Throttle {
    stride: u64,
    debounce: Duration,
    counter: Option<FrameCounter>,
}

impl Throttle {
    /// Policy that forwards every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy forwarding only every `stride`th message.
    pub fn every(stride: u64) -> Self {
        Self::new().with_stride(stride)
    }

    /// Set the sampling stride. A stride of 0 or 1 forwards everything.
    #[must_use]
    pub fn with_stride(mut self, stride: u64) -> Self {
        self.stride = stride;
        self
    }

    /// Coalesce forwarded messages within `window` into the last value,
    /// delivered only after `window` of inactivity.
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Sample against a shared reference counter instead of this
    /// wrapper's own invocation count: a message is forwarded when the
    /// reference counter's current value is a multiple of the stride.
    #[must_use]
    pub fn with_counter(mut self, counter: &FrameCounter) -> Self {
        self.counter = Some(counter.clone());
        self
    }

    /// Produce a wrapped handler suitable for
    /// [`crate::registry::ChannelRegistry::subscribe`].
    ///
    /// With a debounce window set, this spawns a delivery task and must be
    /// called from within a tokio runtime. The pending value of a burst is
    /// still delivered after the quiet period even if the wrapped handler
    /// has been unsubscribed meanwhile.
    pub fn wrap(self, mut handler: Handler) -> Handler {
        let stride = self.stride.max(1);
        let counter = self.counter;
        let mut local: u64 = 0;
        let mut passes = move || -> bool {
            match &counter {
                Some(shared) => shared.get() % stride == 0,
                None => {
                    local += 1;
                    local % stride == 0
                }
            }
        };

        if self.debounce.is_zero() {
            return Box::new(move |fields| {
                if passes() {
                    handler(fields);
                }
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        drop(tokio::spawn(debounce_worker(rx, handler, self.debounce)));
        Box::new(move |fields| {
            if passes() {
                // Worker gone only on runtime shutdown; nothing to deliver to.
                let _ = tx.send(fields);
            }
        })
    }
}

/// Trailing-edge debounce loop: each arriving value restarts the quiet
/// period; when it elapses, the last value wins.
async fn debounce_worker(
    mut rx: mpsc::UnboundedReceiver<Vec<String>>,
    mut handler: Handler,
    window: Duration,
) {
    loop {
        let Some(mut pending) = rx.recv().await else {
            return;
        };
        loop {
            tokio::select! {
                () = tokio::time::sleep(window) => {
                    deliver(&mut handler, pending);
                    break;
                }
                next = rx.recv() => match next {
                    Some(fields) => pending = fields,
                    None => {
                        // Sender dropped with a burst in flight: honor the
                        // quiet period, deliver the trailing value, stop.
                        tokio::time::sleep(window).await;
                        deliver(&mut handler, pending);
                        return;
                    }
                },
            }
        }
    }
}

fn deliver(handler: &mut Handler, fields: Vec<String>) {
    if catch_unwind(AssertUnwindSafe(|| handler(fields))).is_err() {
        error!("debounced handler panicked, value dropped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
