use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use so2view_client::ClientConfig;
use so2view_frame::Channel;
use so2view_payload::{ChannelKind, ChannelOrder, ChannelTable, DEFAULT_SPECTRUM_SAMPLES};
use so2view_transport::ReconnectPolicy;

use crate::exit::{CliError, CliResult, DATA_INVALID, USAGE};

/// Settings read from `--config <file.json>`.
///
/// Every field is optional; command-line flags win over file values.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub max_payload_bytes: Option<usize>,
    pub reconnect: Option<ReconnectSection>,
    pub reconnect_on_failure: Option<bool>,
    pub color_order: Option<ColorOrder>,
    /// Replaces the built-in channel table when present.
    pub channels: Option<Vec<ChannelEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSection {
    pub delay_ms: u64,
    /// Enables exponential backoff capped at this delay.
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgb,
    Bgr,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Image,
    Spectrum,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default)]
    pub kind: EntryKind,
    /// Spectrum length; defaults to 2048.
    pub samples: Option<usize>,
}

impl FileConfig {
    pub fn load_optional(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            CliError::new(USAGE, format!("cannot read config {}: {err}", path.display()))
        })?;
        Self::parse(&text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("{}: {err}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Overlay file settings onto `config`.
    pub fn apply(&self, mut config: ClientConfig) -> CliResult<ClientConfig> {
        if let Some(ms) = self.poll_interval_ms {
            if ms == 0 {
                return Err(CliError::new(USAGE, "poll_interval_ms must be greater than zero"));
            }
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.read_timeout_ms {
            config.frame.read_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(max) = self.max_payload_bytes {
            config.frame.max_payload_size = max;
        }
        if let Some(section) = &self.reconnect {
            config.reconnect = section.policy();
        }
        if let Some(enabled) = self.reconnect_on_failure {
            config.reconnect_on_failure = enabled;
        }
        if let Some(order) = self.color_order {
            config.image.source_order = match order {
                ColorOrder::Rgb => ChannelOrder::Rgb,
                ColorOrder::Bgr => ChannelOrder::Bgr,
            };
        }
        if let Some(entries) = &self.channels {
            config.channels = channel_table(entries)?;
        }
        Ok(config)
    }
}

impl ReconnectSection {
    fn policy(&self) -> ReconnectPolicy {
        let delay = Duration::from_millis(self.delay_ms);
        let policy = match self.max_delay_ms {
            Some(max) => ReconnectPolicy::exponential(delay, Duration::from_millis(max)),
            None => ReconnectPolicy::fixed(delay),
        };
        match self.max_attempts {
            Some(attempts) => policy.with_max_attempts(attempts),
            None => policy,
        }
    }
}

fn channel_table(entries: &[ChannelEntry]) -> CliResult<ChannelTable> {
    let mut table = ChannelTable::empty();
    for entry in entries {
        let channel = Channel::new(&entry.name)
            .map_err(|err| CliError::new(USAGE, format!("config channel: {err}")))?;
        let kind = match entry.kind {
            EntryKind::Image => ChannelKind::Image,
            EntryKind::Spectrum => ChannelKind::Spectrum {
                samples: entry.samples.unwrap_or(DEFAULT_SPECTRUM_SAMPLES),
            },
        };
        table.insert(channel, kind);
    }
    Ok(table)
}
