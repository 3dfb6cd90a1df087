//! Typed telemetry payloads for the known channels.
//!
//! The wire sends every payload field as a string. [`TelemetryUpdate::parse`]
//! turns a `(channel, fields)` pair into a closed set of message shapes, so
//! consumers that want structure don't each re-implement field indexing and
//! numeric parsing. Channels this crate does not know about decode to
//! [`TelemetryUpdate::Unknown`], keeping the client forward compatible with
//! devices that add new streams.

use std::str::FromStr;

use crate::channels;
use crate::errors::TelemetryError;

/// Divisor applied to the wire value of the focus sharpness score.
const FOCUS_SCALE: f64 = 100.0;

/// One decoded telemetry message.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryUpdate {
    /// Live video frame: optional display range plus a frame reference
    /// (a URI or inline-encoded image usable directly as an image source).
    Camera {
        /// Lower display bound in ADU, when sent.
        min: Option<u32>,
        /// Upper display bound in ADU, when sent.
        max: Option<u32>,
        /// Frame reference, always the last payload field.
        frame_ref: String,
    },

    /// Per-color-channel pixel intensity statistics.
    PixelStats {
        /// Red channel mean intensity.
        r: u32,
        /// Green channel mean intensity.
        g: u32,
        /// Blue channel mean intensity.
        b: u32,
    },

    /// Autofocus sharpness score. The wire value is scaled by 100; this is
    /// the descaled score.
    Focus {
        /// Sharpness score, higher is sharper.
        sharpness: f64,
    },

    /// Vertical spectral profile.
    Spectrum {
        /// Full-width-half-maximum of the profile.
        fwhm: f64,
        /// Vertical intensity series.
        profile: Vec<f64>,
    },

    /// Horizontal intensity profile.
    Intensity {
        /// Horizontal intensity series.
        profile: Vec<f64>,
    },

    /// One-shot completion notification for an asynchronous processing job.
    ScanProcess {
        /// Full channel name, `scan_process_<hash>`.
        channel: String,
        /// Result status reported by the device.
        status: String,
    },

    /// A channel this client has no contract for. Fields are passed through
    /// untouched.
    Unknown {
        /// Channel name as received.
        channel: String,
        /// Raw payload fields.
        fields: Vec<String>,
    },
}

impl TelemetryUpdate {
    /// Decode a dispatched payload into its typed shape.
    ///
    /// A malformed payload on a *known* channel is an error; an unknown
    /// channel is not (it decodes to [`TelemetryUpdate::Unknown`]).
    pub fn parse(channel: &str, fields: &[String]) -> Result<Self, TelemetryError> {
        match channel {
            channels::CAMERA => parse_camera(fields),
            channels::ADU => parse_pixel_stats(fields),
            channels::FOCUS => parse_focus(fields),
            channels::SPECTRUM => parse_spectrum(fields),
            channels::INTENSITY => parse_intensity(fields),
            other if channels::is_scan_process(other) => parse_scan_process(other, fields),
            other => Ok(Self::Unknown {
                channel: other.to_owned(),
                fields: fields.to_vec(),
            }),
        }
    }

    /// Channel name this update was decoded from.
    pub fn channel(&self) -> &str {
        match self {
            Self::Camera { .. } => channels::CAMERA,
            Self::PixelStats { .. } => channels::ADU,
            Self::Focus { .. } => channels::FOCUS,
            Self::Spectrum { .. } => channels::SPECTRUM,
            Self::Intensity { .. } => channels::INTENSITY,
            Self::ScanProcess { channel, .. } | Self::Unknown { channel, .. } => channel,
        }
    }
}

fn parse_camera(fields: &[String]) -> Result<TelemetryUpdate, TelemetryError> {
    match fields {
        [frame_ref] => Ok(TelemetryUpdate::Camera {
            min: None,
            max: None,
            frame_ref: frame_ref.clone(),
        }),
        [min, max, frame_ref] => Ok(TelemetryUpdate::Camera {
            min: Some(numeric(channels::CAMERA, "min", min)?),
            max: Some(numeric(channels::CAMERA, "max", max)?),
            frame_ref: frame_ref.clone(),
        }),
        _ => Err(field_count(channels::CAMERA, "1 or 3", fields.len())),
    }
}

fn parse_pixel_stats(fields: &[String]) -> Result<TelemetryUpdate, TelemetryError> {
    let [r, g, b] = fields else {
        return Err(field_count(channels::ADU, "3", fields.len()));
    };
    Ok(TelemetryUpdate::PixelStats {
        r: numeric(channels::ADU, "r", r)?,
        g: numeric(channels::ADU, "g", g)?,
        b: numeric(channels::ADU, "b", b)?,
    })
}

fn parse_focus(fields: &[String]) -> Result<TelemetryUpdate, TelemetryError> {
    let [score] = fields else {
        return Err(field_count(channels::FOCUS, "1", fields.len()));
    };
    let raw: f64 = numeric(channels::FOCUS, "sharpness", score)?;
    Ok(TelemetryUpdate::Focus {
        sharpness: raw / FOCUS_SCALE,
    })
}

fn parse_spectrum(fields: &[String]) -> Result<TelemetryUpdate, TelemetryError> {
    let [fwhm, series] = fields else {
        return Err(field_count(channels::SPECTRUM, "2", fields.len()));
    };
    Ok(TelemetryUpdate::Spectrum {
        fwhm: numeric(channels::SPECTRUM, "fwhm", fwhm)?,
        profile: parse_series(channels::SPECTRUM, "profile", series)?,
    })
}

fn parse_intensity(fields: &[String]) -> Result<TelemetryUpdate, TelemetryError> {
    let [series] = fields else {
        return Err(field_count(channels::INTENSITY, "1", fields.len()));
    };
    Ok(TelemetryUpdate::Intensity {
        profile: parse_series(channels::INTENSITY, "profile", series)?,
    })
}

fn parse_scan_process(channel: &str, fields: &[String]) -> Result<TelemetryUpdate, TelemetryError> {
    let [status] = fields else {
        return Err(field_count_owned(channel, "1", fields.len()));
    };
    Ok(TelemetryUpdate::ScanProcess {
        channel: channel.to_owned(),
        status: status.clone(),
    })
}

/// Parse one numeric payload field.
fn numeric<T: FromStr>(
    channel: &'static str,
    field: &'static str,
    value: &str,
) -> Result<T, TelemetryError> {
    value.trim().parse().map_err(|_| TelemetryError::NumericField {
        channel: channel.to_owned(),
        field,
        value: value.to_owned(),
    })
}

/// Parse a comma-separated numeric series. Empty segments are skipped so a
/// trailing comma does not fail the whole update.
fn parse_series(
    channel: &'static str,
    field: &'static str,
    value: &str,
) -> Result<Vec<f64>, TelemetryError> {
    value
        .split(',')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| numeric(channel, field, segment))
        .collect()
}

fn field_count(channel: &'static str, expected: &'static str, got: usize) -> TelemetryError {
    field_count_owned(channel, expected, got)
}

fn field_count_owned(channel: &str, expected: &'static str, got: usize) -> TelemetryError {
    TelemetryError::FieldCount {
        channel: channel.to_owned(),
        expected,
        got,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
