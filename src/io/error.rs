// src/io/error.rs
//
// Typed errors for the adapter transport.

use std::fmt;
use std::time::Duration;

/// Errors raised by the codec, connection and bus layers.
#[derive(Debug, Clone, PartialEq)]
pub enum IoError {
    /// Connect retries exhausted within the allowed wait.
    ConnectTimeout {
        device: String,
        waited: Duration,
        attempts: u32,
    },
    /// Peer closed the socket (zero-byte read).
    ConnectionClosed { device: String },
    /// Any I/O failure while writing an outbound frame.
    WriteFailed { device: String, message: String },
    /// Readiness or read failure other than an orderly close.
    Read { device: String, message: String },
    /// Decode was handed a slice that is not exactly one wire frame.
    MalformedFrame { len: usize },
    /// Operation attempted after `shutdown`.
    TransportClosed { device: String },
    /// Outbound message cannot be represented on the wire.
    InvalidMessage(String),
    /// Bad or unreadable configuration.
    Configuration(String),
}

impl IoError {
    pub fn connect_timeout(device: &str, waited: Duration, attempts: u32) -> Self {
        IoError::ConnectTimeout {
            device: device.to_string(),
            waited,
            attempts,
        }
    }

    pub fn connection_closed(device: &str) -> Self {
        IoError::ConnectionClosed {
            device: device.to_string(),
        }
    }

    pub fn write_failed(device: &str, message: impl Into<String>) -> Self {
        IoError::WriteFailed {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn read(device: &str, message: impl Into<String>) -> Self {
        IoError::Read {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed_frame(len: usize) -> Self {
        IoError::MalformedFrame { len }
    }

    pub fn transport_closed(device: &str) -> Self {
        IoError::TransportClosed {
            device: device.to_string(),
        }
    }

    pub fn invalid_message(message: impl Into<String>) -> Self {
        IoError::InvalidMessage(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration(message.into())
    }

    /// Device label the error refers to, if any.
    pub fn device(&self) -> Option<&str> {
        match self {
            IoError::ConnectTimeout { device, .. }
            | IoError::ConnectionClosed { device }
            | IoError::WriteFailed { device, .. }
            | IoError::Read { device, .. }
            | IoError::TransportClosed { device } => Some(device),
            IoError::MalformedFrame { .. }
            | IoError::InvalidMessage(_)
            | IoError::Configuration(_) => None,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::ConnectTimeout {
                device,
                waited,
                attempts,
            } => write!(
                f,
                "{}: failed to connect within {} ms ({} attempts)",
                device,
                waited.as_millis(),
                attempts
            ),
            IoError::ConnectionClosed { device } => {
                write!(f, "{}: connection closed by peer", device)
            }
            IoError::WriteFailed { device, message } => {
                write!(f, "{}: write failed: {}", device, message)
            }
            IoError::Read { device, message } => write!(f, "{}: read failed: {}", device, message),
            IoError::MalformedFrame { len } => {
                write!(f, "malformed frame: {} bytes, expected 13", len)
            }
            IoError::TransportClosed { device } => write!(f, "{}: transport is shut down", device),
            IoError::InvalidMessage(msg) => write!(f, "invalid message: {}", msg),
            IoError::Configuration(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for String {
    fn from(err: IoError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_connect_timeout() {
        let err = IoError::connect_timeout("eth2can(10.0.0.5:4001)", Duration::from_millis(1500), 7);
        assert_eq!(
            err.to_string(),
            "eth2can(10.0.0.5:4001): failed to connect within 1500 ms (7 attempts)"
        );
    }

    #[test]
    fn test_device_accessor() {
        assert_eq!(
            IoError::transport_closed("eth2can(h:1)").device(),
            Some("eth2can(h:1)")
        );
        assert_eq!(IoError::malformed_frame(12).device(), None);
    }

    #[test]
    fn test_into_string() {
        let s: String = IoError::malformed_frame(4).into();
        assert!(s.contains("4 bytes"));
    }
}
