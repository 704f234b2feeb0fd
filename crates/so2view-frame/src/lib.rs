//! Length-prefixed request/response framing for the so2control protocol.
//!
//! Both directions carry a 4-byte little-endian length followed by exactly
//! that many bytes:
//! - requests: `u32` length (always 3) + a 3-byte ASCII channel command
//! - responses: `i32` size + body, where a size of 0 means "no data"
//!
//! No partial reads, no buffer management in user code.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use channel::{Channel, BOT, BUILTIN, CAM, CMP, COMMAND_LEN, SPC, TOP};
pub use codec::{
    decode_frame, encode_channel, encode_request, encode_response, FrameConfig,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
