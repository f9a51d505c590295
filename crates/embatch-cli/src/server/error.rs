//! Startup and serve failures of the HTTP listener.

use std::io;

use thiserror::Error;

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Error raised while starting or running the HTTP server.
///
/// Each variant carries a stable code (`E001`..`E003`) that is logged next
/// to an operator hint.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server configuration rejected: {0}")]
    InvalidConfig(String),

    #[error("cannot listen on {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server stopped unexpectedly: {0}")]
    Runtime(#[source] io::Error),
}

/// Hint for io failures that may clear up on a later start.
fn transient_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("Pick a port of 1024 or above"),
        io::ErrorKind::AddrInUse => Some("Another process holds this port, choose a different --port"),
        io::ErrorKind::AddrNotAvailable => Some("No local interface has this --host address"),
        io::ErrorKind::Interrupted => Some("Interrupted, starting again should work"),
        io::ErrorKind::TimedOut => Some("Timed out, check the network and retry"),
        io::ErrorKind::ConnectionRefused => Some("Connection refused, retry once the peer is up"),
        _ => None,
    }
}

impl ServerError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "E001",
            Self::BindError { .. } => "E002",
            Self::Runtime(_) => "E003",
        }
    }

    fn io_source(&self) -> Option<&io::Error> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::BindError { source, .. } | Self::Runtime(source) => Some(source),
        }
    }

    /// Returns `true` if starting again, possibly after an environment
    /// change, may succeed.
    pub fn is_recoverable(&self) -> bool {
        self.io_source()
            .and_then(|source| transient_hint(source.kind()))
            .is_some()
    }

    /// Operator hint for resolving the failure.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig(_) => Some("Check the command-line flags and environment variables"),
            Self::BindError { source, .. } => {
                transient_hint(source.kind()).or(Some("Check the network configuration"))
            }
            Self::Runtime(source) => transient_hint(source.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_in_use_is_recoverable() {
        let error = ServerError::BindError {
            address: "127.0.0.1:3000".to_owned(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };

        assert_eq!(error.error_code(), "E002");
        assert!(error.is_recoverable());
        assert!(error.suggestion().is_some_and(|s| s.contains("--port")));
        assert!(error.to_string().contains("127.0.0.1:3000"));
    }

    #[test]
    fn invalid_config_is_not_recoverable() {
        let error = ServerError::InvalidConfig("port too low".to_owned());
        assert_eq!(error.error_code(), "E001");
        assert!(!error.is_recoverable());
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn unknown_runtime_error_has_no_hint() {
        let error = ServerError::Runtime(io::Error::other("boom"));
        assert_eq!(error.error_code(), "E003");
        assert!(!error.is_recoverable());
        assert!(error.suggestion().is_none());
    }
}
