//! Error types for wire frame parsing and telemetry decoding.
//!
//! Both error kinds are recovered locally by the client: a bad frame or an
//! undecodable payload is logged and dropped, never surfaced to consumers.

use thiserror::Error;

/// Failure to split a raw wire frame into channel + payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The fixed delimiter sequence was absent from the frame.
    #[error("frame missing delimiter: {preview:?}")]
    MissingDelimiter {
        /// Truncated copy of the offending frame, for logging.
        preview: String,
    },
}

/// Failure to decode a known channel's payload into a typed update.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    /// The payload had an unexpected number of fields.
    #[error("channel {channel}: expected {expected} payload fields, got {got}")]
    FieldCount {
        /// Channel whose payload failed to decode.
        channel: String,
        /// Human-readable expected field count (e.g. `"1 or 3"`).
        expected: &'static str,
        /// Number of fields actually present.
        got: usize,
    },

    /// A payload field that must be numeric was not.
    #[error("channel {channel}: field {field} is not numeric: {value:?}")]
    NumericField {
        /// Channel whose payload failed to decode.
        channel: String,
        /// Name of the offending field.
        field: &'static str,
        /// Raw field value as received.
        value: String,
    },
}
