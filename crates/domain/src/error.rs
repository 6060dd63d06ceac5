//! Shared error taxonomy for toolport crates.
//!
//! A single closed enum: callers decide propagation and retry behavior
//! by matching on the variant (or on [`ErrorKind`]), never by walking
//! an error-source chain.

/// Error type used across all toolport crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Connection refused/unreachable, authorization failure (401/403,
    /// with the status attached), or handshake failure.
    #[error("connection: {message}")]
    Connection {
        message: String,
        status: Option<u16>,
    },

    /// The remote returned an HTTP error status (400–599, auth excluded).
    #[error("server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// JSON-RPC `error` member in an otherwise successful HTTP response.
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// Malformed response body, id mismatch, timeout, or any other
    /// transport-layer failure not otherwise classified.
    #[error("transport: {0}")]
    Transport(String),

    /// Unexpected failure during tool listing/invocation, wrapped once
    /// at the facade boundary and naming the operation or tool.
    #[error("tool call '{operation}' failed: {message}")]
    ToolCall { operation: String, message: String },
}

/// Flat classification of [`Error`] for retry and propagation decisions.
///
/// Authorization failures are `Connection` variants but classify as
/// `Auth` so the retry policy can include connectivity while excluding
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Auth,
    Server,
    Remote,
    Transport,
    ToolCall,
}

impl Error {
    /// A connection error with no HTTP status attached.
    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
            status: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection {
                status: Some(401) | Some(403),
                ..
            } => ErrorKind::Auth,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Server { .. } => ErrorKind::Server,
            Error::Remote { .. } => ErrorKind::Remote,
            Error::Transport(_) => ErrorKind::Transport,
            Error::ToolCall { .. } => ErrorKind::ToolCall,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
