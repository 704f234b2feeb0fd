//! Channel commands.
//!
//! A channel is named by exactly three ASCII bytes, which are also the
//! request sent on the wire. The control software answers at least the
//! built-in set below; it may recognise others.

use std::fmt;
use std::str::FromStr;

use crate::error::{FrameError, Result};

/// Length of every channel command on the wire.
pub const COMMAND_LEN: usize = 3;

/// Upper (310 nm) camera image.
pub const TOP: Channel = Channel(*b"top");
/// Lower (330 nm) camera image.
pub const BOT: Channel = Channel(*b"bot");
/// Webcam image.
pub const CAM: Channel = Channel(*b"cam");
/// Spectrometer reading.
pub const SPC: Channel = Channel(*b"spc");
/// Composite image.
pub const CMP: Channel = Channel(*b"cmp");

/// Built-in channels in their canonical polling order.
pub const BUILTIN: [Channel; 5] = [TOP, BOT, CAM, SPC, CMP];

/// A validated 3-byte ASCII channel command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel([u8; COMMAND_LEN]);

impl Channel {
    /// Validate a channel name.
    pub fn new(name: &str) -> Result<Self> {
        if !name.is_ascii() {
            return Err(FrameError::InvalidChannel {
                name: name.to_string(),
                reason: "not ASCII",
            });
        }
        let bytes: [u8; COMMAND_LEN] =
            name.as_bytes()
                .try_into()
                .map_err(|_| FrameError::InvalidChannel {
                    name: name.to_string(),
                    reason: "must be exactly 3 characters",
                })?;
        Ok(Self(bytes))
    }

    /// Wire bytes of the command.
    pub fn as_bytes(&self) -> &[u8; COMMAND_LEN] {
        &self.0
    }

    /// The command as text.
    pub fn as_str(&self) -> &str {
        // Only ASCII is accepted by `new`.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for Channel {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({:?})", self.as_str())
    }
}
