/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The channel command cannot be put on the wire.
    #[error("invalid channel {name:?}: {reason}")]
    InvalidChannel { name: String, reason: &'static str },

    /// The peer announced a negative body size.
    #[error("invalid frame size {0}")]
    NegativeSize(i32),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for malformed channel identifiers (nothing was sent).
    pub fn is_encoding(&self) -> bool {
        matches!(self, FrameError::InvalidChannel { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
