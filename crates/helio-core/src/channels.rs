//! Channel name vocabulary for the scanner's multiplexed streams.
//!
//! Channel names are opaque strings, global within one connection. The
//! continuous streams use the fixed names below; one-shot processing
//! notifications use a name parameterized by a content hash of the job's
//! input (`scan_process_<hash>`).

/// Live video frame stream.
pub const CAMERA: &str = "camera";

/// Per-color-channel pixel intensity statistics.
pub const ADU: &str = "adu";

/// Autofocus sharpness score stream.
pub const FOCUS: &str = "focus";

/// Vertical spectral profile (FWHM + intensity series).
pub const SPECTRUM: &str = "spectrum";

/// Horizontal intensity profile.
pub const INTENSITY: &str = "intensity";

/// Prefix of one-shot processing-completion channels.
pub const SCAN_PROCESS_PREFIX: &str = "scan_process_";

/// Channel name for the completion notification of a processing job,
/// identified by the content hash of its input.
pub fn scan_process_channel(content_hash: &str) -> String {
    format!("{SCAN_PROCESS_PREFIX}{content_hash}")
}

/// Whether `channel` is a one-shot processing-completion channel.
pub fn is_scan_process(channel: &str) -> bool {
    channel.starts_with(SCAN_PROCESS_PREFIX)
}
