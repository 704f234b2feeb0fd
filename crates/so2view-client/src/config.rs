use std::time::Duration;

use so2view_frame::FrameConfig;
use so2view_payload::{ChannelTable, ImageOptions};
use so2view_transport::ReconnectPolicy;

/// Default interval between dispatch passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a [`Connection`](crate::Connection) and its poller need.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Which channel carries which payload kind.
    pub channels: ChannelTable,
    /// Interval between dispatch passes.
    pub poll_interval: Duration,
    /// Policy used by `connect` and `reconnect`.
    pub reconnect: ReconnectPolicy,
    /// Frame limits and socket timeouts.
    pub frame: FrameConfig,
    /// Image decoding options.
    pub image: ImageOptions,
    /// Try one reconnect at the start of a pass when the link is down.
    pub reconnect_on_failure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channels: ChannelTable::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            frame: FrameConfig::default(),
            image: ImageOptions::default(),
            reconnect_on_failure: false,
        }
    }
}

impl ClientConfig {
    pub fn with_channels(mut self, channels: ChannelTable) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_frame(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Set the per-request read timeout. `None` blocks until the service answers.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.frame.read_timeout = timeout;
        self
    }

    pub fn with_image(mut self, image: ImageOptions) -> Self {
        self.image = image;
        self
    }

    pub fn with_reconnect_on_failure(mut self, enabled: bool) -> Self {
        self.reconnect_on_failure = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_instrument_service() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert!(config.frame.read_timeout.is_none());
        assert!(!config.reconnect_on_failure);
        assert_eq!(config.channels.len(), 5);
    }

    #[test]
    fn builders_override_fields() {
        let config = ClientConfig::default()
            .with_poll_interval(Duration::from_millis(250))
            .with_read_timeout(Some(Duration::from_secs(5)))
            .with_reconnect_on_failure(true);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.frame.read_timeout, Some(Duration::from_secs(5)));
        assert!(config.reconnect_on_failure);
    }
}
