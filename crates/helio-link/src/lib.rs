//! # helio-link
//!
//! Real-time telemetry multiplexing client for the scanner device.
//!
//! One persistent WebSocket connection carries every stream the device
//! publishes (live frame, pixel statistics, focus score, spectral
//! profiles), tagged per message with a channel name. This crate
//! demultiplexes that connection, rate-limits per consumer, and fans the
//! streams out to whoever is currently interested.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `transport` | Connection lifecycle: connect, reconnect with backoff, teardown |
//! | `registry` | Channel name → handler map; subscribe/unsubscribe/dispatch |
//! | `router` | Raw frame → `(channel, fields)` → registry dispatch |
//! | `throttle` | Sampling stride + trailing-edge debounce for handlers |
//! | `client` | `TelemetryClient` facade consumers hold |
//! | `config` | Device endpoint address |
//!
//! ## Data Flow
//!
//! `transport` (read loop) → `router` (parse + dispatch) → `registry` →
//! the channel's current handler, wrapped in its `throttle` policy.
//!
//! Subscriptions are independent of the connection lifecycle: a handler
//! registered before a connection drop keeps receiving messages after the
//! automatic reconnect, without re-subscribing.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;
pub mod registry;
pub mod router;
pub mod throttle;
pub mod transport;

pub use client::TelemetryClient;
pub use config::DeviceConfig;
pub use errors::TransportError;
pub use registry::{ChannelRegistry, Handler};
pub use router::FrameRouter;
pub use throttle::{FrameCounter, Throttle};
pub use transport::{ConnectionState, Transport};
