//! Device endpoint configuration.

use serde::{Deserialize, Serialize};

/// Address of the scanner device.
///
/// Passing a config with a different address to
/// [`crate::client::TelemetryClient::connect`] tears down the current
/// connection and opens a new one; passing the same address is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device host name or IP.
    pub host: String,
    /// Device port.
    pub port: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

impl DeviceConfig {
    /// WebSocket URL of the device's telemetry endpoint.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }
}
