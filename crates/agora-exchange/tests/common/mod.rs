//! Scripted in-memory transport for driving the exchange.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;

use agora_core::{FeeRate, ProductRegistry, TraderId};
use agora_exchange::{Exchange, TraderRegistry};
use agora_net::{ChannelEvent, ChannelId, Transport};

#[derive(Default)]
pub struct ScriptedTransport {
    events: VecDeque<ChannelEvent>,
    inboxes: HashMap<ChannelId, VecDeque<String>>,
    sent: Vec<(ChannelId, String)>,
}

impl ScriptedTransport {
    /// Queue a message from `channel`, as the gateway would after framing.
    pub fn push_message(&mut self, channel: ChannelId, message: &str) {
        let frame = message.strip_suffix(';').unwrap_or(message);
        self.inboxes
            .entry(channel)
            .or_default()
            .push_back(frame.to_string());
        self.events.push_back(ChannelEvent::Activity(channel));
    }

    pub fn push_disconnect(&mut self, channel: ChannelId) {
        self.events.push_back(ChannelEvent::Disconnected(channel));
    }

    pub fn push_event(&mut self, event: ChannelEvent) {
        self.events.push_back(event);
    }

    /// Messages sent to `channel`, oldest first.
    pub fn sent_to(&self, channel: ChannelId) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl Transport for ScriptedTransport {
    fn next_event(&mut self) -> io::Result<ChannelEvent> {
        self.events
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "script exhausted"))
    }

    fn read_message(&mut self, channel: ChannelId) -> Option<String> {
        self.inboxes.get_mut(&channel)?.pop_front()
    }

    fn send(&mut self, channel: ChannelId, data: &[u8]) -> io::Result<()> {
        self.sent
            .push((channel, String::from_utf8_lossy(data).into_owned()));
        Ok(())
    }
}

/// Trader `i` is reachable on channel `10 + i`.
pub fn channel(trader: u32) -> ChannelId {
    ChannelId(10 + trader as usize)
}

pub fn exchange(products: &[&str], traders: u32, fee_rate: FeeRate) -> Exchange<ScriptedTransport> {
    let products = ProductRegistry::new(products.iter().copied()).unwrap();
    let mut registry = TraderRegistry::new();
    for id in 0..traders {
        registry.register(TraderId(id), channel(id)).unwrap();
    }
    Exchange::new(ScriptedTransport::default(), products, registry, fee_rate).unwrap()
}

/// Deliver one message from `trader` and process it.
pub fn deliver(exchange: &mut Exchange<ScriptedTransport>, trader: u32, message: &str) {
    exchange.transport_mut().push_message(channel(trader), message);
    let event = exchange.transport_mut().next_event().unwrap();
    exchange.handle_event(event).unwrap();
}

pub fn disconnect(exchange: &mut Exchange<ScriptedTransport>, trader: u32) {
    exchange
        .handle_event(ChannelEvent::Disconnected(channel(trader)))
        .unwrap();
}
