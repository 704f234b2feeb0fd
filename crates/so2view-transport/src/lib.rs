//! TCP transport for the instrument-control link.
//!
//! This is the lowest layer of so2view. It opens the single TCP stream the
//! client talks over, retrying according to a [`ReconnectPolicy`], and
//! publishes every transition of the link on a [`StateSignal`].

pub mod error;
pub mod policy;
pub mod state;
pub mod tcp;

pub use error::{Result, TransportError};
pub use policy::ReconnectPolicy;
pub use state::{ConnectionState, StateSignal};
pub use tcp::TcpConnector;
