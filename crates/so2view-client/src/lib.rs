//! Client side of the so2control instrument protocol.
//!
//! A [`Connection`] owns the TCP link and performs one request/response
//! exchange at a time. A [`Registry`] holds per-channel subscribers, a
//! [`Dispatcher`] runs one fetch-and-notify pass over them, and a [`Poller`]
//! repeats that pass on a fixed interval until stopped. [`Client`] bundles
//! the four for the common case.
//!
//! ```no_run
//! use so2view_client::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig::default());
//! client.connect("localhost", 7009)?;
//! client.subscribe("bot", |payload, metadata| {
//!     println!("{} from {:?}", payload.kind_name(), metadata.channel());
//! })?;
//! client.start();
//! # client.stop();
//! # Ok::<(), so2view_client::ClientError>(())
//! ```

#[cfg(feature = "async")]
pub mod async_poller;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod poller;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "async")]
pub use async_poller::AsyncPoller;
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_POLL_INTERVAL};
pub use connection::Connection;
pub use dispatch::{ChannelFailure, DispatchReport, Dispatcher, Fetch};
pub use error::{ClientError, ErrorKind, Result};
pub use poller::{CancelToken, Poller, PollerState, MIN_POLL_INTERVAL};
pub use registry::{Callback, Registry};
