//! # helio-core
//!
//! Foundation types for the scanner telemetry link.
//!
//! This crate provides the shared vocabulary the client crate builds on:
//!
//! - **Wire frames**: [`frame::RawFrame`] — channel-tagged field sequences
//!   split on the fixed [`frame::FRAME_DELIMITER`]
//! - **Channels**: [`channels`] — the known stream names plus the
//!   `scan_process_<hash>` one-shot naming scheme
//! - **Telemetry**: [`telemetry::TelemetryUpdate`] — typed payload per known
//!   channel, with an `Unknown` fallback for forward compatibility
//! - **Reconnect**: [`reconnect::ReconnectPolicy`] and backoff calculation
//! - **Errors**: [`errors::FrameError`] and [`errors::TelemetryError`] via `thiserror`
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `helio-link`.

#![deny(unsafe_code)]

pub mod channels;
pub mod errors;
pub mod frame;
pub mod logging;
pub mod reconnect;
pub mod telemetry;
