//! Typed payloads for the so2control channels.
//!
//! Every response body is decoded according to the channel it answers:
//! image channels carry an encoded still image (PNG) with textual metadata
//! chunks, the spectrum channel carries a fixed number of little-endian
//! `f64` samples. Which channel carries what is an explicit [`ChannelTable`].

pub mod channel;
pub mod error;
pub mod imaging;
pub mod metadata;
pub mod payload;
pub mod spectrum;

pub use channel::{ChannelKind, ChannelSpec, ChannelTable, DEFAULT_SPECTRUM_SAMPLES};
pub use error::{DecodeError, Result};
pub use imaging::{decode_image, ChannelOrder, ImageFrame, ImageOptions, Samples};
pub use metadata::{extract_text_metadata, Metadata, CHANNEL_KEY, CREATION_TIME_KEY};
pub use payload::{decode, Payload, Reading};
pub use spectrum::{decode_spectrum, Spectrum};
