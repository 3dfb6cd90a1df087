//! Raw wire frames: channel-tagged field sequences.
//!
//! Every frame on the device connection is a single text message whose
//! fields are joined by [`FRAME_DELIMITER`]. Field 0 is the channel name;
//! the remaining fields are channel-specific payload, preserved in order as
//! strings. The frame layer performs no type coercion — interpreting a
//! payload is the owning consumer's job (see `telemetry`).

use crate::errors::FrameError;

/// Fixed multi-character delimiter between frame fields.
pub const FRAME_DELIMITER: &str = ";#;";

/// Longest frame prefix kept when logging a malformed frame.
const PREVIEW_LEN: usize = 64;

/// A parsed inbound frame: channel name plus opaque payload fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Channel name (wire field 0).
    pub channel: String,
    /// Payload fields (wire fields 1..n), order-preserved.
    pub fields: Vec<String>,
}

impl RawFrame {
    /// Split a raw text frame on [`FRAME_DELIMITER`].
    ///
    /// A frame that does not contain the delimiter at all is malformed and
    /// yields [`FrameError::MissingDelimiter`]; callers log and drop it.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        if !raw.contains(FRAME_DELIMITER) {
            return Err(FrameError::MissingDelimiter {
                preview: preview(raw),
            });
        }
        let mut parts = raw.split(FRAME_DELIMITER).map(str::to_owned);
        let channel = parts.next().unwrap_or_default();
        Ok(Self {
            channel,
            fields: parts.collect(),
        })
    }

    /// Join a channel name and payload fields into an outbound frame.
    pub fn encode(channel: &str, fields: &[&str]) -> String {
        let mut out = String::from(channel);
        for field in fields {
            out.push_str(FRAME_DELIMITER);
            out.push_str(field);
        }
        out
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_LEN).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
