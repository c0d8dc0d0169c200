//! Trader gateway implementation using mio.
//!
//! Every trader is connected through a pair of non-blocking pipes. A single
//! `Poll` watches all of them, so new data and trader termination are
//! observed from one wait point. Readiness is turned into an explicit FIFO
//! of [`ChannelEvent`]s: one `Activity` per complete message, one
//! `Disconnected` per closed channel.

use mio::unix::pipe::{Receiver, Sender};
use mio::{Events, Interest, Poll, Token};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use tracing::{debug, trace, warn};

use agora_proto::{MessageParser, MAX_MESSAGE_LEN};
use crate::transport::{ChannelEvent, ChannelId, Transport};

const READ_BUFFER_SIZE: usize = 4096;
const EVENTS_CAPACITY: usize = 256;

#[inline(always)]
fn read_token(channel: ChannelId) -> Token {
    Token(channel.0 * 2)
}

#[inline(always)]
fn write_token(channel: ChannelId) -> Token {
    Token(channel.0 * 2 + 1)
}

#[inline(always)]
fn token_channel(token: Token) -> (ChannelId, bool) {
    (ChannelId(token.0 / 2), token.0 % 2 == 0)
}

/// Per-trader state.
pub struct Connection {
    receiver: Receiver,
    sender: Sender,
    read_buffer: Box<[u8; READ_BUFFER_SIZE]>,
    read_pos: usize,
    write_buffer: Vec<u8>,
    inbox: VecDeque<String>,
    /// Skipping the tail of an oversized message up to its terminator.
    discarding: bool,
    /// Inbound side still delivering data.
    open: bool,
    /// Outbound side still accepting data.
    writable: bool,
}

impl Connection {
    fn new(receiver: Receiver, sender: Sender) -> Self {
        Self {
            receiver,
            sender,
            read_buffer: Box::new([0; READ_BUFFER_SIZE]),
            read_pos: 0,
            write_buffer: Vec::new(),
            inbox: VecDeque::new(),
            discarding: false,
            open: true,
            writable: true,
        }
    }

    /// Queue data for writing.
    fn queue_write(&mut self, data: &[u8]) {
        self.write_buffer.extend_from_slice(data);
    }

    /// Messages received but not yet read.
    pub fn pending_messages(&self) -> usize {
        self.inbox.len()
    }
}

/// Trader gateway.
pub struct Gateway {
    poll: Poll,
    connections: Vec<Connection>,
    pending: VecDeque<ChannelEvent>,
}

impl Gateway {
    /// Create a gateway with no channels.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            connections: Vec::new(),
            pending: VecDeque::new(),
        })
    }

    /// Start watching a trader's pipes. Both ends must be non-blocking.
    ///
    /// `receiver` carries trader → exchange messages, `sender` the reverse.
    pub fn attach(&mut self, mut receiver: Receiver, mut sender: Sender) -> io::Result<ChannelId> {
        let channel = ChannelId(self.connections.len());

        self.poll
            .registry()
            .register(&mut receiver, read_token(channel), Interest::READABLE)?;
        self.poll
            .registry()
            .register(&mut sender, write_token(channel), Interest::WRITABLE)?;

        self.connections.push(Connection::new(receiver, sender));
        debug!(%channel, "channel attached");
        Ok(channel)
    }

    /// Number of channels still delivering data.
    pub fn open_count(&self) -> usize {
        self.connections.iter().filter(|c| c.open).count()
    }

    /// Get number of attached channels.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connection state for `channel`.
    pub fn connection(&self, channel: ChannelId) -> Option<&Connection> {
        self.connections.get(channel.0)
    }

    /// Wait once for readiness and queue the resulting events.
    fn poll_once(&mut self) -> io::Result<()> {
        let mut mio_events = Events::with_capacity(EVENTS_CAPACITY);

        match self.poll.poll(&mut mio_events, None) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }

        for event in mio_events.iter() {
            let (channel, is_read_side) = token_channel(event.token());
            if channel.0 >= self.connections.len() {
                continue;
            }

            if is_read_side {
                self.read_from_connection(channel);
            } else if event.is_writable() || event.is_write_closed() || event.is_error() {
                self.write_to_connection(channel);
            }
        }

        Ok(())
    }

    fn read_from_connection(&mut self, channel: ChannelId) {
        let mut closed = false;

        loop {
            let conn = &mut self.connections[channel.0];
            if !conn.open {
                return;
            }

            match conn.receiver.read(&mut conn.read_buffer[conn.read_pos..]) {
                Ok(0) => {
                    closed = true;
                    break;
                }
                Ok(n) => {
                    conn.read_pos += n;
                    trace!(%channel, bytes = n, "read");
                    self.parse_messages(channel);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(%channel, error = %e, "read failed");
                    closed = true;
                    break;
                }
            }
        }

        if closed {
            self.close(channel);
        }
    }

    /// Move every complete frame from the read buffer into the inbox.
    fn parse_messages(&mut self, channel: ChannelId) {
        let conn = &mut self.connections[channel.0];
        let mut consumed = 0;

        // The rest of an already reported oversized message.
        if conn.discarding {
            match MessageParser::split_frame(&conn.read_buffer[..conn.read_pos]) {
                Some((_, used)) => {
                    conn.discarding = false;
                    consumed = used;
                }
                None => {
                    conn.read_pos = 0;
                    return;
                }
            }
        }

        while let Some((frame, used)) =
            MessageParser::split_frame(&conn.read_buffer[consumed..conn.read_pos])
        {
            let message = if frame.len() > MAX_MESSAGE_LEN {
                warn!(%channel, len = frame.len(), "oversized message discarded");
                String::new()
            } else {
                String::from_utf8_lossy(frame).into_owned()
            };
            conn.inbox.push_back(message);
            self.pending.push_back(ChannelEvent::Activity(channel));
            consumed += used;
        }

        // Compact buffer
        if consumed > 0 {
            conn.read_buffer.copy_within(consumed..conn.read_pos, 0);
            conn.read_pos -= consumed;
        }

        if conn.read_pos > MAX_MESSAGE_LEN {
            warn!(%channel, len = conn.read_pos, "unterminated message discarded");
            conn.read_pos = 0;
            conn.discarding = true;
            conn.inbox.push_back(String::new());
            self.pending.push_back(ChannelEvent::Activity(channel));
        }
    }

    fn write_to_connection(&mut self, channel: ChannelId) {
        let conn = &mut self.connections[channel.0];

        while conn.writable && !conn.write_buffer.is_empty() {
            match conn.sender.write(&conn.write_buffer) {
                Ok(0) => break,
                Ok(n) => {
                    conn.write_buffer.drain(..n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // The read side reports the disconnect.
                    debug!(%channel, error = %e, "write failed, dropping output");
                    conn.writable = false;
                    conn.write_buffer.clear();
                }
            }
        }
    }

    fn close(&mut self, channel: ChannelId) {
        let conn = &mut self.connections[channel.0];
        if !conn.open {
            return;
        }

        conn.open = false;
        conn.read_pos = 0;
        if let Err(e) = self.poll.registry().deregister(&mut conn.receiver) {
            debug!(%channel, error = %e, "deregister failed");
        }
        self.pending.push_back(ChannelEvent::Disconnected(channel));
        debug!(%channel, "channel closed");
    }
}

impl Transport for Gateway {
    fn next_event(&mut self) -> io::Result<ChannelEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            if self.open_count() == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "no open trader channels",
                ));
            }

            self.poll_once()?;
        }
    }

    fn read_message(&mut self, channel: ChannelId) -> Option<String> {
        self.connections.get_mut(channel.0)?.inbox.pop_front()
    }

    fn send(&mut self, channel: ChannelId, data: &[u8]) -> io::Result<()> {
        let conn = self.connections.get_mut(channel.0).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("unknown channel {}", channel))
        })?;

        if !conn.writable {
            return Ok(());
        }

        conn.queue_write(data);
        self.write_to_connection(channel);
        Ok(())
    }
}
