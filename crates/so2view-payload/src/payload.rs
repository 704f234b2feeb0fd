use crate::channel::{ChannelKind, ChannelSpec};
use crate::error::{DecodeError, Result};
use crate::imaging::{decode_image, ImageFrame, ImageOptions};
use crate::metadata::{Metadata, CHANNEL_KEY};
use crate::spectrum::{decode_spectrum, Spectrum};

/// Decoded content of one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Image(ImageFrame),
    Spectrum(Spectrum),
}

impl Payload {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::Image(_) => "image",
            Payload::Spectrum(_) => "spectrum",
        }
    }

    pub fn as_image(&self) -> Option<&ImageFrame> {
        match self {
            Payload::Image(frame) => Some(frame),
            Payload::Spectrum(_) => None,
        }
    }

    pub fn as_spectrum(&self) -> Option<&Spectrum> {
        match self {
            Payload::Spectrum(spectrum) => Some(spectrum),
            Payload::Image(_) => None,
        }
    }
}

/// One fetched item: payload plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub payload: Payload,
    pub metadata: Metadata,
}

impl Reading {
    /// Channel the reading was requested on.
    pub fn channel(&self) -> Option<&str> {
        self.metadata.channel()
    }
}

/// Decode a non-empty response body according to the channel's kind.
///
/// The channel name is always recorded under [`CHANNEL_KEY`], overriding a
/// text field of the same name.
pub fn decode(spec: &ChannelSpec, body: &[u8], options: &ImageOptions) -> Result<Reading> {
    if body.is_empty() {
        return Err(DecodeError::EmptyBody);
    }

    let (payload, mut metadata) = match spec.kind {
        ChannelKind::Spectrum { samples } => (
            Payload::Spectrum(decode_spectrum(body, samples)?),
            Metadata::new(),
        ),
        ChannelKind::Image => {
            let (frame, metadata) = decode_image(body, options)?;
            (Payload::Image(frame), metadata)
        }
    };

    metadata.insert(CHANNEL_KEY, spec.channel.as_str());
    Ok(Reading { payload, metadata })
}
