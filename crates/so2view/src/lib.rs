//! Client for so2control camera and spectrometer services.
//!
//! so2view talks to an instrument service over a small length-prefixed TCP
//! protocol: each request names a three-letter channel, each response is an
//! encoded image or a spectrum. Readings are delivered to subscribers on a
//! fixed poll interval.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect with reconnect policy and state signal
//! - [`frame`]: request/response framing
//! - [`payload`]: channel table and payload decoders
//! - [`client`]: connection, registry, dispatcher and poll scheduler

/// Re-export transport types.
pub mod transport {
    pub use so2view_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use so2view_frame::*;
}

/// Re-export payload types.
pub mod payload {
    pub use so2view_payload::*;
}

/// Re-export client types.
pub mod client {
    pub use so2view_client::*;
}

pub use so2view_client::{Client, ClientConfig, ClientError, ErrorKind};
pub use so2view_payload::{Metadata, Payload, Reading};
