//! The exchange coordinator.
//!
//! A single control flow that takes one channel event at a time from the
//! transport and processes it to completion before looking at the next:
//!
//! ```text
//! AwaitingEvent ── Activity ──▶ ProcessingOrderMessage ──▶ (match + report) ──▶ AwaitingEvent
//! AwaitingEvent ── Disconnected ──▶ ProcessingDisconnect ──▶ AwaitingEvent
//! ```
//!
//! The loop ends once every registered trader has disconnected.

use std::io;

use agora_core::{
    FeeRate, MatchingEngine, Order, PositionMatrix, ProductRegistry, Trade, TraderId,
};
use agora_metrics::{EventTimer, LatencyHistogram};
use agora_net::{ChannelEvent, ChannelId, Transport};
use agora_proto::{CommandKind, MessageParser, Outbound, Reject};
use tracing::{debug, info, warn};

use crate::error::{ExchangeError, Result};
use crate::registry::{Trader, TraderRegistry};
use crate::report;

/// Final state handed back when trading completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub total_fees: u64,
    pub positions: PositionMatrix,
}

/// Check a BUY/SELL message against the product list and the sender's
/// order id sequence. Checks run in a fixed order and stop at the first
/// failure.
pub fn validate_order(
    products: &ProductRegistry,
    trader: &Trader,
    message: &str,
) -> std::result::Result<Order, Reject> {
    let msg = MessageParser::parse_order(message)?;
    let product = products.index_of(msg.product).ok_or(Reject::UnknownProduct)?;
    let order_id = msg.checked_order_id()?;
    let quantity = msg.checked_quantity()?;
    let price = msg.checked_price()?;

    if order_id != trader.expected_order_id(msg.side) {
        return Err(Reject::OutOfSequence);
    }

    Ok(Order::new(order_id, trader.id, product, msg.side, price, quantity))
}

/// Exchange state machine over a [`Transport`].
pub struct Exchange<T: Transport> {
    transport: T,
    products: ProductRegistry,
    traders: TraderRegistry,
    engine: MatchingEngine,
    disconnected: usize,
    latency: LatencyHistogram,
    timer: EventTimer,
}

impl<T: Transport> Exchange<T> {
    /// Create an exchange for an already registered set of traders.
    pub fn new(
        transport: T,
        products: ProductRegistry,
        traders: TraderRegistry,
        fee_rate: FeeRate,
    ) -> Result<Self> {
        let engine = MatchingEngine::new(products.product_count(), traders.len(), fee_rate);

        Ok(Self {
            transport,
            products,
            traders,
            engine,
            disconnected: 0,
            latency: LatencyHistogram::new()?,
            timer: EventTimer::new(),
        })
    }

    /// Tell every connected trader that trading has started.
    pub fn open_market(&mut self) -> Result<()> {
        let open = Outbound::MarketOpen.encode();
        for trader in self.traders.connected() {
            self.transport.send(trader.channel, open.as_bytes())?;
        }
        info!(
            traders = self.traders.len(),
            products = self.products.product_count(),
            fee_rate = %self.engine.fee_rate(),
            "Market open"
        );
        Ok(())
    }

    /// `true` once every trader has disconnected.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.disconnected >= self.traders.len()
    }

    /// Process events until every trader has disconnected.
    pub fn run(&mut self) -> Result<Settlement> {
        while !self.is_finished() {
            let event = self.transport.next_event().map_err(|e| match e.kind() {
                io::ErrorKind::NotConnected => ExchangeError::TransportClosed,
                _ => ExchangeError::Io(e),
            })?;

            let start = self.timer.now();
            self.handle_event(event)?;
            self.latency.record(self.timer.elapsed_nanos(start));
        }

        info!("Trading completed");
        info!("Exchange fees collected: ${}", self.engine.total_fees());
        self.latency.log_summary("Event processing latency");

        Ok(Settlement {
            total_fees: self.engine.total_fees(),
            positions: self.engine.positions().clone(),
        })
    }

    /// Process one event to completion.
    pub fn handle_event(&mut self, event: ChannelEvent) -> Result<()> {
        match event {
            ChannelEvent::Activity(channel) => self.on_activity(channel),
            ChannelEvent::Disconnected(channel) => self.on_disconnect(channel),
        }
    }

    fn trader_for(&self, channel: ChannelId) -> Result<TraderId> {
        self.traders
            .lookup_by_channel(channel)
            .map(|t| t.id)
            .ok_or(ExchangeError::UnknownChannel(channel))
    }

    fn on_activity(&mut self, channel: ChannelId) -> Result<()> {
        let trader = self.trader_for(channel)?;

        let Some(message) = self.transport.read_message(channel) else {
            warn!(%trader, %channel, "activity without a pending message");
            return Ok(());
        };
        debug!(%trader, message = %message, "received");

        match MessageParser::classify(&message) {
            CommandKind::Buy | CommandKind::Sell => self.on_order(trader, channel, &message),
            CommandKind::Amend | CommandKind::Cancel => {
                debug!(%trader, message = %message, "order mutation not supported, ignored");
                Ok(())
            }
            CommandKind::Unknown => self.reject(trader, channel, &message, Reject::UnknownCommand),
        }
    }

    fn on_order(&mut self, trader_id: TraderId, channel: ChannelId, message: &str) -> Result<()> {
        let trader = self
            .traders
            .lookup_by_id(trader_id)
            .ok_or(ExchangeError::UnknownTrader(trader_id))?;

        let order = match validate_order(&self.products, trader, message) {
            Ok(order) => order,
            Err(reason) => return self.reject(trader_id, channel, message, reason),
        };

        if let Some(trader) = self.traders.lookup_by_id_mut(trader_id) {
            trader.advance_order_id(order.side);
        }

        self.send(channel, Outbound::Accepted(order.order_id))?;
        self.broadcast_market(trader_id, &order)?;

        self.engine.submit(order)?;
        let trades = self.engine.try_match(order.product, &self.traders)?;
        for trade in &trades {
            self.notify_fills(trade)?;
            log_trade(trade);
        }

        report::log_snapshot(&self.products, &self.traders, &self.engine);
        Ok(())
    }

    /// `MARKET ...;` to every connected trader except the originator.
    fn broadcast_market(&mut self, origin: TraderId, order: &Order) -> Result<()> {
        let product = self
            .products
            .name(order.product)
            .ok_or(agora_core::EngineError::UnknownProduct(order.product))?;

        let market = Outbound::Market {
            side: order.side,
            product,
            quantity: order.quantity,
            price: order.price,
        }
        .encode();

        for other in self.traders.connected().filter(|t| t.id != origin) {
            self.transport.send(other.channel, market.as_bytes())?;
        }
        Ok(())
    }

    /// `FILL ...;` to each counterparty that is still connected.
    fn notify_fills(&mut self, trade: &Trade) -> Result<()> {
        for fill in trade.fills() {
            let trader = self
                .traders
                .lookup_by_id(fill.trader)
                .ok_or(ExchangeError::UnknownTrader(fill.trader))?;
            if !trader.connected {
                continue;
            }

            let msg = Outbound::Fill {
                order_id: fill.order_id,
                quantity: fill.quantity,
            };
            self.transport.send(trader.channel, msg.encode().as_bytes())?;
        }
        Ok(())
    }

    fn on_disconnect(&mut self, channel: ChannelId) -> Result<()> {
        let trader = self.trader_for(channel)?;

        if self.traders.mark_disconnected(trader)? {
            self.disconnected += 1;
            info!("Trader {} disconnected", trader);
        } else {
            warn!(%trader, "duplicate disconnect ignored");
        }
        Ok(())
    }

    fn reject(
        &mut self,
        trader: TraderId,
        channel: ChannelId,
        message: &str,
        reason: Reject,
    ) -> Result<()> {
        debug!(%trader, message = %message, %reason, "rejected");
        self.send(channel, Outbound::Invalid)
    }

    fn send(&mut self, channel: ChannelId, msg: Outbound<'_>) -> Result<()> {
        self.transport.send(channel, msg.encode().as_bytes())?;
        Ok(())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn traders(&self) -> &TraderRegistry {
        &self.traders
    }

    pub fn products(&self) -> &ProductRegistry {
        &self.products
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Traders that have disconnected so far.
    pub fn disconnected_count(&self) -> usize {
        self.disconnected
    }
}

fn log_trade(trade: &Trade) {
    info!(
        target: "agora::match",
        "Match: Order {} [T{}], Order {} [T{}], value: ${}, fee: ${}.",
        trade.buy_order,
        trade.buyer,
        trade.sell_order,
        trade.seller,
        trade.value,
        trade.fee,
    );
}
