use std::net::TcpStream;
use std::thread;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::policy::ReconnectPolicy;
use crate::state::{ConnectionState, StateSignal};

/// Opens the TCP stream to the instrument service.
///
/// `connect` blocks the calling thread until the service accepts the
/// connection or the policy gives up. Every transition is published on the
/// connector's [`StateSignal`].
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    policy: ReconnectPolicy,
    signal: StateSignal,
}

impl TcpConnector {
    /// Create a connector with the default (retry every second) policy.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            policy: ReconnectPolicy::default(),
            signal: StateSignal::new(),
        }
    }

    /// Override the reconnect policy.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Publish transitions on an existing signal instead of a private one.
    pub fn with_signal(mut self, signal: StateSignal) -> Self {
        self.signal = signal;
        self
    }

    /// `host:port` of the remote service.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The state signal this connector publishes on.
    pub fn signal(&self) -> &StateSignal {
        &self.signal
    }

    /// Active reconnect policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Connect, retrying per policy (blocking).
    pub fn connect(&self) -> Result<TcpStream> {
        let addr = self.addr();
        self.signal.set(ConnectionState::Connecting);

        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            match self.open() {
                Ok(stream) => {
                    info!(%addr, attempts, "connected to instrument service");
                    self.signal.set(ConnectionState::Connected);
                    return Ok(stream);
                }
                Err(err) => {
                    if !self.policy.should_retry(attempts) {
                        warn!(%addr, attempts, error = %err, "giving up on instrument service");
                        self.signal.set(ConnectionState::Disconnected);
                        return Err(TransportError::RetriesExhausted {
                            addr,
                            attempts,
                            last: err,
                        });
                    }
                    let delay = self.policy.delay_after(attempts);
                    warn!(%addr, attempts, error = %err, ?delay, "not yet connected");
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Make exactly one connection attempt.
    pub fn connect_once(&self) -> Result<TcpStream> {
        let addr = self.addr();
        self.signal.set(ConnectionState::Connecting);
        match self.open() {
            Ok(stream) => {
                info!(%addr, "connected to instrument service");
                self.signal.set(ConnectionState::Connected);
                Ok(stream)
            }
            Err(source) => {
                self.signal.set(ConnectionState::Disconnected);
                Err(TransportError::Connect { addr, source })
            }
        }
    }

    fn open(&self) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        // Requests are 7 bytes; do not let Nagle hold them back.
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "tcp stream opened");
        Ok(stream)
    }
}
