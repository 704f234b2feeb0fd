use std::sync::{Arc, Mutex, PoisonError};

use so2view_frame::Channel;
use so2view_payload::{ChannelTable, Metadata, Payload};
use tracing::debug;

use crate::error::Result;

/// Subscriber callback, invoked with each fresh reading of its channel.
pub type Callback = Arc<dyn Fn(&Payload, &Metadata) + Send + Sync>;

/// Per-channel subscriber lists.
///
/// Cloning yields another handle to the same registry. Each registry is an
/// independent instance; nothing is shared between registries.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<RegistryInner>>,
}

struct RegistryInner {
    table: ChannelTable,
    entries: Vec<(Channel, Vec<Callback>)>,
}

impl Registry {
    /// Create an empty registry ordering channels by `table`.
    pub fn new(table: ChannelTable) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                table,
                entries: Vec::new(),
            })),
        }
    }

    /// Append `callback` to `channel`'s subscribers.
    ///
    /// The same callback may be registered more than once; it then runs once
    /// per registration.
    pub fn subscribe<F>(&self, channel: &str, callback: F) -> Result<()>
    where
        F: Fn(&Payload, &Metadata) + Send + Sync + 'static,
    {
        let channel = Channel::new(channel)?;
        self.subscribe_callback(channel, Arc::new(callback));
        Ok(())
    }

    /// Append an already shared callback.
    pub fn subscribe_callback(&self, channel: Channel, callback: Callback) {
        let mut inner = self.lock();
        match inner.entries.iter_mut().find(|(c, _)| *c == channel) {
            Some((_, callbacks)) => callbacks.push(callback),
            None => inner.entries.push((channel, vec![callback])),
        }
        debug!(%channel, "subscriber added");
    }

    /// Subscribed channels with their callbacks, in polling order.
    ///
    /// Table channels come first in table order, then the remaining channels
    /// in the order they were first subscribed.
    pub fn snapshot(&self) -> Vec<(Channel, Vec<Callback>)> {
        let inner = self.lock();
        let mut entries = inner.entries.clone();
        entries.sort_by_key(|(channel, _)| inner.table.position(channel).unwrap_or(usize::MAX));
        entries
    }

    /// Subscribed channels in polling order.
    pub fn channels(&self) -> Vec<Channel> {
        self.snapshot().into_iter().map(|(channel, _)| channel).collect()
    }

    /// Number of callbacks registered for `channel`.
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.lock()
            .entries
            .iter()
            .find(|(c, _)| c == channel)
            .map_or(0, |(_, callbacks)| callbacks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn table(&self) -> ChannelTable {
        self.lock().table.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(ChannelTable::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.channels())
            .finish()
    }
}
