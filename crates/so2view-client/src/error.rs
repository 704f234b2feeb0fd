use so2view_frame::FrameError;
use so2view_payload::DecodeError;
use so2view_transport::TransportError;

/// Errors surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connecting to the instrument service failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Request encoding or response framing failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No socket is open.
    #[error("not connected")]
    NotConnected,
}

/// Coarse error classes consumers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Socket unreachable, reset, or closed mid-frame.
    Connection,
    /// Malformed channel identifier.
    Encoding,
    /// Malformed response: bad size header, wrong body length, unreadable image.
    Decode,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) | ClientError::NotConnected => ErrorKind::Connection,
            ClientError::Frame(err) if err.is_encoding() => ErrorKind::Encoding,
            ClientError::Frame(FrameError::NegativeSize(_) | FrameError::PayloadTooLarge { .. }) => {
                ErrorKind::Decode
            }
            ClientError::Frame(_) => ErrorKind::Connection,
            ClientError::Decode(_) => ErrorKind::Decode,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
