//! Trader channel abstraction consumed by the exchange.

use std::fmt;
use std::io;

/// Identity of one trader's bidirectional channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ChannelId(pub usize);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A notification about one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One complete message is waiting on the channel.
    Activity(ChannelId),
    /// The peer went away. Reported once per channel.
    Disconnected(ChannelId),
}

impl ChannelEvent {
    /// Channel the event refers to.
    pub fn channel(&self) -> ChannelId {
        match *self {
            ChannelEvent::Activity(c) | ChannelEvent::Disconnected(c) => c,
        }
    }
}

/// Multiplexed set of trader channels.
///
/// Every `Activity` event corresponds to exactly one message available
/// from [`Transport::read_message`]. Events are delivered one at a time,
/// in arrival order, and are never merged.
pub trait Transport {
    /// Block until the next event is available.
    fn next_event(&mut self) -> io::Result<ChannelEvent>;

    /// Take the oldest complete message from `channel`, terminator removed.
    fn read_message(&mut self, channel: ChannelId) -> Option<String>;

    /// Queue `data` for delivery on `channel`.
    fn send(&mut self, channel: ChannelId, data: &[u8]) -> io::Result<()>;
}
