/// Transport-level error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Connection or I/O error
    ConnectionError(String),
    /// Protocol violation (undecodable frame, token mismatch)
    ProtocolError(String),
    /// Message too large
    MessageTooLarge,
    /// Round trip did not complete in time
    Timeout,
    /// An earlier round trip was abandoned part way, the stream is out of sync
    ConnectionPoisoned,
}

impl DriverError {
    /// Whether the error means the byte stream itself can no longer be trusted.
    pub fn is_protocol_corruption(&self) -> bool {
        matches!(
            self,
            DriverError::ProtocolError(_) | DriverError::MessageTooLarge
        )
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            DriverError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            DriverError::MessageTooLarge => write!(f, "Message too large"),
            DriverError::Timeout => write!(f, "Timed out waiting for the server"),
            DriverError::ConnectionPoisoned => {
                write!(f, "Connection poisoned by an abandoned request")
            }
        }
    }
}

impl std::error::Error for DriverError {}
