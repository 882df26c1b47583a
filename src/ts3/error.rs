use thiserror::Error;

/// Error id the server answers with when a client id is unknown.
pub const ERR_INVALID_CLIENT_ID: u32 = 512;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out waiting for the server")]
    Timeout,

    #[error("Connection closed by the server")]
    Closed,

    #[error("Not connected")]
    NotConnected,

    #[error("Server error {id}: {msg}")]
    Server { id: u32, msg: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl QueryError {
    /// True when the session is unusable and further requests cannot succeed.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Connect { .. } | Self::Timeout | Self::Closed | Self::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_keep_the_session() {
        let err = QueryError::Server { id: 768, msg: "invalid channelID".into() };
        assert!(!err.is_connection_lost());
        assert!(!QueryError::Protocol("bad line".into()).is_connection_lost());
    }

    #[test]
    fn transport_errors_lose_the_session() {
        assert!(QueryError::Closed.is_connection_lost());
        assert!(QueryError::Timeout.is_connection_lost());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(QueryError::from(io).is_connection_lost());
    }

    #[test]
    fn server_error_message() {
        let err = QueryError::Server { id: 520, msg: "invalid loginname or password".into() };
        assert_eq!(err.to_string(), "Server error 520: invalid loginname or password");
    }
}
