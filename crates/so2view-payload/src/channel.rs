//! Which channel carries which payload kind.

use std::fmt;

use so2view_frame::{Channel, BOT, CAM, CMP, SPC, TOP};

/// Samples per spectrum in the control software's current channel contract.
pub const DEFAULT_SPECTRUM_SAMPLES: usize = 2048;

/// Payload kind carried by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Encoded still image with optional text metadata.
    Image,
    /// `samples` consecutive little-endian `f64` values.
    Spectrum { samples: usize },
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Image => f.write_str("image"),
            ChannelKind::Spectrum { samples } => write!(f, "spectrum[{samples}]"),
        }
    }
}

/// A channel together with its payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelSpec {
    pub channel: Channel,
    pub kind: ChannelKind,
}

impl ChannelSpec {
    pub fn new(channel: Channel, kind: ChannelKind) -> Self {
        Self { channel, kind }
    }
}

/// Ordered channel → kind table.
///
/// Order matters: it is the order in which channels are polled. Channels
/// missing from the table are treated as image channels, since the control
/// software may serve more image feeds than the client knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    specs: Vec<ChannelSpec>,
}

impl ChannelTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Add a channel, or change the kind of one already present.
    pub fn insert(&mut self, channel: Channel, kind: ChannelKind) {
        match self.specs.iter_mut().find(|spec| spec.channel == channel) {
            Some(spec) => spec.kind = kind,
            None => self.specs.push(ChannelSpec::new(channel, kind)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, channel: Channel, kind: ChannelKind) -> Self {
        self.insert(channel, kind);
        self
    }

    /// Look up a channel listed in the table.
    pub fn get(&self, channel: &Channel) -> Option<&ChannelSpec> {
        self.specs.iter().find(|spec| spec.channel == *channel)
    }

    /// Spec for any channel, falling back to an image channel.
    pub fn resolve(&self, channel: Channel) -> ChannelSpec {
        self.get(&channel)
            .copied()
            .unwrap_or_else(|| ChannelSpec::new(channel, ChannelKind::Image))
    }

    /// Position of a channel in polling order.
    pub fn position(&self, channel: &Channel) -> Option<usize> {
        self.specs.iter().position(|spec| spec.channel == *channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::empty()
            .with(TOP, ChannelKind::Image)
            .with(BOT, ChannelKind::Image)
            .with(CAM, ChannelKind::Image)
            .with(
                SPC,
                ChannelKind::Spectrum {
                    samples: DEFAULT_SPECTRUM_SAMPLES,
                },
            )
            .with(CMP, ChannelKind::Image)
    }
}
