//! Trader registry.
//!
//! Records every trader for the whole session. Disconnected traders stay
//! registered: their resting orders and position rows remain valid.

use agora_core::{Liveness, OrderId, Side, TraderId};
use agora_net::ChannelId;

use crate::error::{ExchangeError, Result};

/// One trader's session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trader {
    pub id: TraderId,
    pub channel: ChannelId,
    pub connected: bool,
    pub next_buy_order_id: OrderId,
    pub next_sell_order_id: OrderId,
}

impl Trader {
    fn new(id: TraderId, channel: ChannelId) -> Self {
        Self {
            id,
            channel,
            connected: true,
            next_buy_order_id: OrderId(0),
            next_sell_order_id: OrderId(0),
        }
    }

    /// The only order id acceptable next on `side`.
    #[inline]
    pub fn expected_order_id(&self, side: Side) -> OrderId {
        match side {
            Side::Buy => self.next_buy_order_id,
            Side::Sell => self.next_sell_order_id,
        }
    }

    /// Consume the expected id on `side`.
    #[inline]
    pub fn advance_order_id(&mut self, side: Side) {
        match side {
            Side::Buy => self.next_buy_order_id = self.next_buy_order_id.next(),
            Side::Sell => self.next_sell_order_id = self.next_sell_order_id.next(),
        }
    }
}

/// All traders of the session, in registration order.
///
/// Lookups are linear scans; trader counts are bounded by the command line.
#[derive(Debug, Default)]
pub struct TraderRegistry {
    traders: Vec<Trader>,
}

impl TraderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connected trader with both order id counters at 0.
    pub fn register(&mut self, id: TraderId, channel: ChannelId) -> Result<&Trader> {
        if self.lookup_by_id(id).is_some() {
            return Err(ExchangeError::DuplicateTrader(id));
        }
        self.traders.push(Trader::new(id, channel));
        Ok(&self.traders[self.traders.len() - 1])
    }

    /// Trader owning `channel`.
    pub fn lookup_by_channel(&self, channel: ChannelId) -> Option<&Trader> {
        self.traders.iter().find(|t| t.channel == channel)
    }

    pub fn lookup_by_id(&self, id: TraderId) -> Option<&Trader> {
        self.traders.iter().find(|t| t.id == id)
    }

    pub fn lookup_by_id_mut(&mut self, id: TraderId) -> Option<&mut Trader> {
        self.traders.iter_mut().find(|t| t.id == id)
    }

    /// Mark `id` disconnected. Returns `false` if it already was.
    pub fn mark_disconnected(&mut self, id: TraderId) -> Result<bool> {
        let trader = self
            .lookup_by_id_mut(id)
            .ok_or(ExchangeError::UnknownTrader(id))?;
        let was_connected = trader.connected;
        trader.connected = false;
        Ok(was_connected)
    }

    /// Traders still connected, in registration order.
    pub fn connected(&self) -> impl Iterator<Item = &Trader> + '_ {
        self.traders.iter().filter(|t| t.connected)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trader> + '_ {
        self.traders.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.traders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.traders.is_empty()
    }
}

impl Liveness for TraderRegistry {
    fn is_connected(&self, trader: TraderId) -> bool {
        self.lookup_by_id(trader).map_or(false, |t| t.connected)
    }
}
