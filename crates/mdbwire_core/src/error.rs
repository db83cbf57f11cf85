use std::time::Duration;

use thiserror::Error;

/// Broad failure category, used by callers to decide between retrying the
/// request, reconnecting, or fixing the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad URL, scheme or port. Raised before any I/O.
    Configuration,
    /// Establishment or handshake failed; the connection must be discarded.
    Connection,
    /// The request could not be encoded; the connection stays usable.
    ProtocolEncoding,
    /// The socket failed mid-stream; the caller must reconnect.
    TransportIo,
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unsupported parameter type {type_name} for key {key:?}")]
    UnsupportedParameterType { key: String, type_name: &'static str },

    #[error("Non-string parameter key of type {type_name}")]
    NonStringParameterKey { type_name: &'static str },

    #[error("String of {len} bytes does not fit a 32-bit length prefix")]
    LengthOverflow { len: usize },

    #[error("Refusing to flush {unsealed} bytes appended after the last sealed frame")]
    UnsealedFrame { unsealed: usize },
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Could not connect to {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout:?} while establishing connection to {address}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error(
        "Handshake with {address} failed: expected {}, got {}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    HandshakeMismatch {
        address: String,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Handshake with {address} failed: {source}")]
    HandshakeIo {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodeError),

    #[error("Transport error on {address}: {source}")]
    Transport {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot {operation}: connection to {address} is {state}")]
    InvalidState {
        address: String,
        state: &'static str,
        operation: &'static str,
    },
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Configuration(_) => ErrorKind::Configuration,
            DriverError::ConnectionFailed { .. }
            | DriverError::ConnectTimeout { .. }
            | DriverError::HandshakeMismatch { .. }
            | DriverError::HandshakeIo { .. } => ErrorKind::Connection,
            DriverError::Encoding(_) => ErrorKind::ProtocolEncoding,
            DriverError::Transport { .. } | DriverError::InvalidState { .. } => {
                ErrorKind::TransportIo
            }
        }
    }

    /// Whether the connection that produced this error can still carry requests.
    pub fn connection_reusable(&self) -> bool {
        self.kind() == ErrorKind::ProtocolEncoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_mismatch_renders_both_preambles_as_hex() {
        let err = DriverError::HandshakeMismatch {
            address: "localhost:1234".to_string(),
            expected: b"AB".to_vec(),
            actual: b"AC".to_vec(),
        };

        let message = err.to_string();
        assert!(message.contains("localhost:1234"));
        assert!(message.contains("expected 4142, got 4143"));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn encoding_errors_leave_connection_reusable() {
        let err: DriverError = EncodeError::NonStringParameterKey { type_name: "Int64" }.into();

        assert_eq!(err.kind(), ErrorKind::ProtocolEncoding);
        assert!(err.connection_reusable());
    }

    #[test]
    fn transport_errors_are_fatal_to_the_connection() {
        let err = DriverError::Transport {
            address: "db:1234".to_string(),
            source: std::io::Error::other("no data received"),
        };

        assert_eq!(err.kind(), ErrorKind::TransportIo);
        assert!(!err.connection_reusable());
    }
}
