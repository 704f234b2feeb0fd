use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use so2view_payload::{Metadata, Payload, Reading};
use so2view_transport::{ConnectionState, StateSignal};
use tracing::debug;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::Result;
use crate::poller::{Poller, PollerState};
use crate::registry::Registry;

/// One connection, its subscribers and the poller that drives them.
///
/// Every client owns its own instances; two clients never share
/// subscribers or sockets. The socket is serialised by a mutex, so ad-hoc
/// `request` calls may run while the poller is active.
pub struct Client {
    connection: Arc<Mutex<Connection>>,
    dispatcher: Dispatcher<Connection>,
    poller: Poller,
    signal: StateSignal,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let registry = Registry::new(config.channels.clone());
        let interval = config.poll_interval;
        let reconnect_on_failure = config.reconnect_on_failure;

        let connection = Connection::new(config);
        let signal = connection.signal().clone();
        let connection = Arc::new(Mutex::new(connection));

        let dispatcher = Dispatcher::new(Arc::clone(&connection), registry)
            .with_reconnect_on_failure(reconnect_on_failure);
        let pass = dispatcher.clone();
        let poller = Poller::new(interval, move || {
            let report = pass.dispatch_once();
            if !report.is_clean() {
                debug!(
                    failed = report.failed.len(),
                    panics = report.callback_panics,
                    "dispatch pass had failures"
                );
            }
        });

        Self {
            connection,
            dispatcher,
            poller,
            signal,
        }
    }

    /// Connect, retrying per the configured policy (blocking).
    pub fn connect(&self, host: &str, port: u16) -> Result<()> {
        self.lock_connection().connect(host, port)
    }

    pub fn disconnect(&self) {
        self.lock_connection().disconnect();
    }

    /// Register `callback` for readings of `channel`.
    pub fn subscribe<F>(&self, channel: &str, callback: F) -> Result<()>
    where
        F: Fn(&Payload, &Metadata) + Send + Sync + 'static,
    {
        self.dispatcher.registry().subscribe(channel, callback)
    }

    /// One synchronous fetch, outside the subscriber machinery.
    pub fn request(&self, channel: &str) -> Result<Option<Reading>> {
        self.lock_connection().request(channel)
    }

    /// Run a single dispatch pass on the calling thread.
    pub fn dispatch_once(&self) -> DispatchReport {
        self.dispatcher.dispatch_once()
    }

    /// Start polling: one pass now, then one per interval.
    pub fn start(&self) {
        self.poller.start();
    }

    /// Stop polling. Does not wait for a pass in progress.
    pub fn stop(&self) {
        self.poller.stop();
    }

    /// Stop polling and wait for a pass in progress to finish.
    pub fn stop_and_join(&self) {
        self.poller.stop_and_join();
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    /// Current link state; does not wait for an in-flight request.
    pub fn state(&self) -> ConnectionState {
        self.signal.get()
    }

    pub fn on_state_change<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.signal.subscribe(listener);
    }

    pub fn registry(&self) -> &Registry {
        self.dispatcher.registry()
    }

    /// Shared handle to the underlying connection.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.connection)
    }

    fn lock_connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("poller", &self.poller_state())
            .field("registry", self.registry())
            .finish()
    }
}
