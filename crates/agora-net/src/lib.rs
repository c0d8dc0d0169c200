//! Trader I/O for the exchange.
//!
//! Uses mio to multiplex every trader's pipes onto one event stream.

pub mod gateway;
pub mod transport;

pub use gateway::{Connection, Gateway};
pub use transport::{ChannelEvent, ChannelId, Transport};
