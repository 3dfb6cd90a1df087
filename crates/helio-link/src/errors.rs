//! Client-side error types.
//!
//! Socket-level failures are recovered by the transport's reconnect loop
//! and surfaced only as connection state; the errors here are the ones a
//! caller can actually act on.

use thiserror::Error;

/// Errors returned by [`crate::transport::Transport`] operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No live connection to the device.
    #[error("not connected to the device")]
    NotConnected,

    /// The outbound queue is full; the message was dropped.
    #[error("outbound queue full, message dropped")]
    QueueFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            TransportError::NotConnected.to_string(),
            "not connected to the device"
        );
        assert_eq!(
            TransportError::QueueFull.to_string(),
            "outbound queue full, message dropped"
        );
    }
}
