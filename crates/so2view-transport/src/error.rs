/// Errors that can occur while establishing the TCP link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A single connection attempt failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// A bounded reconnect policy ran out of attempts.
    #[error("gave up connecting to {addr} after {attempts} attempts: {last}")]
    RetriesExhausted {
        addr: String,
        attempts: u32,
        last: std::io::Error,
    },

    /// An I/O error occurred while configuring the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The underlying I/O error, if any.
    pub fn io_source(&self) -> &std::io::Error {
        match self {
            TransportError::Connect { source, .. } => source,
            TransportError::RetriesExhausted { last, .. } => last,
            TransportError::Io(err) => err,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
