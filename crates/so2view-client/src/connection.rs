use std::net::{Shutdown, TcpStream};

use bytes::Bytes;
use so2view_frame::{Channel, FrameError, FrameReader, FrameWriter};
use so2view_payload::{decode, ChannelTable, Reading};
use so2view_transport::{ConnectionState, StateSignal, TcpConnector, TransportError};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

struct Link {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
}

#[derive(Debug, Clone)]
struct Target {
    host: String,
    port: u16,
}

/// A blocking request/response link to the instrument service.
///
/// One exchange is in flight at a time: `request` takes `&mut self`, so
/// sharing a connection between threads goes through a `Mutex`.
///
/// A framing failure leaves the stream at an unknown position, so the socket
/// is dropped and the state moves to `Disconnected`. A body that frames
/// correctly but fails to decode leaves the link usable.
pub struct Connection {
    config: ClientConfig,
    signal: StateSignal,
    target: Option<Target>,
    link: Option<Link>,
}

impl Connection {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            signal: StateSignal::new(),
            target: None,
            link: None,
        }
    }

    /// Connect to `host:port`, retrying per the configured policy (blocking).
    ///
    /// With the default policy this only returns once the service accepts.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.target = Some(Target {
            host: host.to_string(),
            port,
        });
        self.reconnect()
    }

    /// Re-open the link to the last target, retrying per policy.
    pub fn reconnect(&mut self) -> Result<()> {
        let connector = self.connector()?;
        self.close_link();
        let stream = connector.connect()?;
        self.attach(stream)
    }

    /// Make a single connect attempt to the last target.
    pub fn reconnect_once(&mut self) -> Result<()> {
        let connector = self.connector()?;
        self.close_link();
        let stream = connector.connect_once()?;
        self.attach(stream)
    }

    /// Close the socket. The target is kept for `reconnect`.
    pub fn disconnect(&mut self) {
        self.close_link();
        self.signal.set(ConnectionState::Disconnected);
    }

    /// Request `channel` and decode the answer.
    ///
    /// Returns `Ok(None)` when the service has no data for the channel.
    pub fn request(&mut self, channel: &str) -> Result<Option<Reading>> {
        let channel = Channel::new(channel)?;
        self.request_channel(channel)
    }

    /// Request an already validated channel.
    pub fn request_channel(&mut self, channel: Channel) -> Result<Option<Reading>> {
        let body = self.exchange(channel)?;
        if body.is_empty() {
            debug!(%channel, "no data");
            return Ok(None);
        }

        let spec = self.config.channels.resolve(channel);
        let reading = decode(&spec, &body, &self.config.image)?;
        debug!(%channel, kind = reading.payload.kind_name(), bytes = body.len(), "reading decoded");
        Ok(Some(reading))
    }

    /// Request `channel` and return the undecoded body.
    pub fn request_raw(&mut self, channel: Channel) -> Result<Bytes> {
        self.exchange(channel)
    }

    pub fn state(&self) -> ConnectionState {
        self.signal.get()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.config.channels
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Signal carrying this connection's state transitions.
    pub fn signal(&self) -> &StateSignal {
        &self.signal
    }

    /// Register a listener for state transitions.
    pub fn on_state_change<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.signal.subscribe(listener);
    }

    /// `host:port` of the last target, if any.
    pub fn peer(&self) -> Option<String> {
        self.target
            .as_ref()
            .map(|target| format!("{}:{}", target.host, target.port))
    }

    fn connector(&self) -> Result<TcpConnector> {
        let target = self.target.as_ref().ok_or(ClientError::NotConnected)?;
        Ok(TcpConnector::new(target.host.clone(), target.port)
            .with_policy(self.config.reconnect.clone())
            .with_signal(self.signal.clone()))
    }

    fn attach(&mut self, stream: TcpStream) -> Result<()> {
        match self.split(stream) {
            Ok(link) => {
                self.link = Some(link);
                Ok(())
            }
            Err(err) => {
                self.signal.set(ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    fn split(&self, stream: TcpStream) -> Result<Link> {
        let reader_stream = stream.try_clone().map_err(TransportError::Io)?;
        let reader = FrameReader::with_config_tcp(reader_stream, self.config.frame.clone())?;
        let writer = FrameWriter::with_config_tcp(stream, self.config.frame.clone())?;
        Ok(Link { reader, writer })
    }

    fn exchange(&mut self, channel: Channel) -> Result<Bytes> {
        let link = self.link.as_mut().ok_or(ClientError::NotConnected)?;
        let result = link
            .writer
            .send_request(&channel)
            .and_then(|()| link.reader.read_frame());

        match result {
            Ok(body) => Ok(body),
            Err(err) => {
                self.drop_link(channel, &err);
                Err(err.into())
            }
        }
    }

    fn drop_link(&mut self, channel: Channel, err: &FrameError) {
        warn!(%channel, error = %err, "dropping connection after framing failure");
        self.close_link();
        self.signal.set(ConnectionState::Disconnected);
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            let _ = link.writer.get_ref().shutdown(Shutdown::Both);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close_link();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
