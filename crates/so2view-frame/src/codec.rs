use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::channel::{Channel, COMMAND_LEN};
use crate::error::{FrameError, Result};

/// Frame header: a single 4-byte little-endian length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum response body size: 64 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Encode a request for `channel` into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────────────┐
/// │ Length (4B)  │ Command (3B)      │
/// │ u32 LE = 3   │ ASCII, e.g. "spc" │
/// └──────────────┴───────────────────┘
/// ```
///
/// Fails with [`FrameError::InvalidChannel`] unless `channel` is exactly
/// three ASCII characters.
pub fn encode_request(channel: &str, dst: &mut BytesMut) -> Result<()> {
    let channel = Channel::new(channel)?;
    encode_channel(&channel, dst);
    Ok(())
}

/// Encode a request for an already validated channel.
pub fn encode_channel(channel: &Channel, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + COMMAND_LEN);
    dst.put_u32_le(COMMAND_LEN as u32);
    dst.put_slice(channel.as_bytes());
}

/// Encode a response body, the way the control software answers a request.
///
/// An empty body encodes the "no data" response (size 0).
pub fn encode_response(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    let size = i32::try_from(body.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: body.len(),
        max: i32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_i32_le(size);
    dst.put_slice(body);
    Ok(())
}

/// Decode one frame body from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// A size of 0 yields an empty body as soon as the header is available.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let size = i32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    if size < 0 {
        return Err(FrameError::NegativeSize(size));
    }
    let size = size as usize;

    if size > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + size {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(size).freeze()))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum response body size in bytes. Default: 64 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations. Default: none (block forever).
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
