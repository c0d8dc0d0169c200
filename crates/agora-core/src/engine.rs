//! Matching engine core.
//!
//! Owns every product's order book, the position matrix and the fee
//! accumulator. Matching is driven explicitly: after an order is
//! submitted, the caller runs [`MatchingEngine::try_match`] for that
//! order's product only.

use alloc::vec::Vec;
use core::fmt;
use crate::book::OrderBook;
use crate::fixed::{FeeRate, Price, Quantity};
use crate::order::{Order, OrderId, ProductId, Side, TraderId};
use crate::position::{Position, PositionMatrix};

/// Answers whether a trader is still connected.
///
/// Positions and fees are attributed differently when one side of a
/// trade has already gone away.
pub trait Liveness {
    /// `true` while `trader` is connected.
    fn is_connected(&self, trader: TraderId) -> bool;
}

impl<F> Liveness for F
where
    F: Fn(TraderId) -> bool,
{
    fn is_connected(&self, trader: TraderId) -> bool {
        self(trader)
    }
}

/// Internal invariant violations. These indicate a registry or bootstrap
/// bug; callers treat them as fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Product index outside the registry.
    UnknownProduct(ProductId),
    /// Trader id outside the position matrix.
    UnknownTrader(TraderId),
    /// A trade's value, fee or resulting position does not fit the
    /// position or fee accumulators.
    SettlementOverflow(ProductId),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownProduct(p) => write!(f, "product index {} out of range", p.0),
            EngineError::UnknownTrader(t) => write!(f, "trader {} has no position row", t.0),
            EngineError::SettlementOverflow(p) => write!(f, "settlement overflow in product {}", p.0),
        }
    }
}

/// Which of the two head orders a trade used up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Buy consumed, sell reduced.
    BuyFilled,
    /// Both consumed.
    BothFilled,
    /// Sell consumed, buy reduced.
    SellFilled,
}

/// One side's share of a trade, addressed to its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    /// Owner of the filled order.
    pub trader: TraderId,
    /// Filled order.
    pub order_id: OrderId,
    /// Quantity filled by this trade.
    pub quantity: Quantity,
}

/// Execution record for a single match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trade {
    /// Product traded.
    pub product: ProductId,
    /// Buy order id.
    pub buy_order: OrderId,
    /// Buyer.
    pub buyer: TraderId,
    /// Sell order id.
    pub sell_order: OrderId,
    /// Seller.
    pub seller: TraderId,
    /// Execution price.
    pub price: Price,
    /// Execution quantity.
    pub quantity: Quantity,
    /// `price * quantity`.
    pub value: u64,
    /// Fee collected on `value`.
    pub fee: u64,
    /// Which head order(s) were removed.
    pub outcome: MatchOutcome,
}

impl Trade {
    /// Buyer's fill, then seller's fill.
    pub fn fills(&self) -> [Fill; 2] {
        [
            Fill {
                trader: self.buyer,
                order_id: self.buy_order,
                quantity: self.quantity,
            },
            Fill {
                trader: self.seller,
                order_id: self.sell_order,
                quantity: self.quantity,
            },
        ]
    }
}

/// Execution price for a trade that consumes the sell order.
///
/// The order with the lower id is treated as having arrived first and
/// sets the price; equal ids take the buy price.
#[inline]
fn earlier_arrival_price(buy: &Order, sell: &Order) -> Price {
    if sell.order_id < buy.order_id {
        sell.price
    } else {
        buy.price
    }
}

/// The matching engine.
///
/// Combines the per-product order books with the position matrix and the
/// running fee total.
pub struct MatchingEngine {
    /// One book per product, indexed by `ProductId`.
    books: Vec<OrderBook>,
    /// Positions of every trader in every product.
    positions: PositionMatrix,
    /// Fee multiplier applied to each trade's value.
    fee_rate: FeeRate,
    /// Fees collected so far; never decreases.
    total_fees: u64,
}

impl MatchingEngine {
    /// Create an engine with empty books and zeroed positions.
    pub fn new(product_count: usize, trader_count: usize, fee_rate: FeeRate) -> Self {
        let mut books = Vec::with_capacity(product_count);
        books.resize_with(product_count, OrderBook::new);

        Self {
            books,
            positions: PositionMatrix::new(trader_count, product_count),
            fee_rate,
            total_fees: 0,
        }
    }

    /// Rest an order on its product's book. Does not match.
    pub fn submit(&mut self, order: Order) -> Result<(), EngineError> {
        let book = self
            .books
            .get_mut(order.product.index())
            .ok_or(EngineError::UnknownProduct(order.product))?;
        book.insert(order);
        Ok(())
    }

    /// Match the heads of `product`'s book until it no longer crosses.
    ///
    /// Returns the trades performed, in execution order. An empty result
    /// means nothing was mutated.
    pub fn try_match<L>(&mut self, product: ProductId, liveness: &L) -> Result<Vec<Trade>, EngineError>
    where
        L: Liveness + ?Sized,
    {
        if product.index() >= self.books.len() {
            return Err(EngineError::UnknownProduct(product));
        }

        let mut trades = Vec::new();
        loop {
            let book = &self.books[product.index()];
            let (buy, sell) = match (book.peek_top(Side::Buy), book.peek_top(Side::Sell)) {
                (Some(buy), Some(sell)) => (*buy, *sell),
                _ => break,
            };

            if buy.price < sell.price {
                break;
            }

            for trader in [buy.trader, sell.trader] {
                if self.positions.row(trader).is_none() {
                    return Err(EngineError::UnknownTrader(trader));
                }
            }

            let trade = self.execute(product, &buy, &sell);
            self.settle(&trade, liveness)?;
            trades.push(trade);
        }

        Ok(trades)
    }

    /// Consume the two head orders and describe the trade.
    fn execute(&mut self, product: ProductId, buy: &Order, sell: &Order) -> Trade {
        let book = &mut self.books[product.index()];

        let (outcome, quantity, price) = if buy.quantity < sell.quantity {
            // A wholly consumed buy always trades at its own price.
            (MatchOutcome::BuyFilled, buy.quantity, buy.price)
        } else if buy.quantity == sell.quantity {
            (MatchOutcome::BothFilled, buy.quantity, earlier_arrival_price(buy, sell))
        } else {
            (MatchOutcome::SellFilled, sell.quantity, earlier_arrival_price(buy, sell))
        };

        match outcome {
            MatchOutcome::BuyFilled => {
                book.reduce_top(Side::Sell, quantity);
                book.pop_top(Side::Buy);
            }
            MatchOutcome::BothFilled => {
                book.pop_top(Side::Buy);
                book.pop_top(Side::Sell);
            }
            MatchOutcome::SellFilled => {
                book.reduce_top(Side::Buy, quantity);
                book.pop_top(Side::Sell);
            }
        }

        let value = price.value_of(quantity);
        Trade {
            product,
            buy_order: buy.order_id,
            buyer: buy.trader,
            sell_order: sell.order_id,
            seller: sell.trader,
            price,
            quantity,
            value,
            fee: self.fee_rate.fee_for(value),
            outcome,
        }
    }

    /// Apply a trade to positions and the fee total.
    ///
    /// With both sides connected the buyer pays the full value and the
    /// seller receives value minus fee. If one side has disconnected,
    /// only the connected side's position moves, by value minus fee.
    ///
    /// Either every update applies or none does.
    fn settle<L>(&mut self, trade: &Trade, liveness: &L) -> Result<(), EngineError>
    where
        L: Liveness + ?Sized,
    {
        let overflow = EngineError::SettlementOverflow(trade.product);

        let total_fees = self.total_fees.checked_add(trade.fee).ok_or(overflow)?;
        let qty = trade.quantity.as_raw();
        let value = i64::try_from(trade.value).map_err(|_| overflow)?;
        let fee = i64::try_from(trade.fee).map_err(|_| overflow)?;
        let net = value.checked_sub(fee).ok_or(overflow)?;

        let (buyer_cost, seller_proceeds) = match (
            liveness.is_connected(trade.buyer),
            liveness.is_connected(trade.seller),
        ) {
            (true, false) => (Some(net), None),
            (false, true) => (None, Some(net)),
            _ => (Some(value), Some(net)),
        };

        let buyer_before = *self.position(trade.buyer, trade.product)?;
        if let Some(cost) = buyer_cost {
            self.position(trade.buyer, trade.product)?
                .buy(qty, cost)
                .ok_or(overflow)?;
        }
        if let Some(proceeds) = seller_proceeds {
            let sold = self.position(trade.seller, trade.product)?.sell(qty, proceeds);
            if sold.is_none() {
                *self.position(trade.buyer, trade.product)? = buyer_before;
                return Err(overflow);
            }
        }

        self.total_fees = total_fees;
        Ok(())
    }

    fn position(
        &mut self,
        trader: TraderId,
        product: ProductId,
    ) -> Result<&mut Position, EngineError> {
        self.positions
            .get_mut(trader, product)
            .ok_or(EngineError::UnknownTrader(trader))
    }

    /// Book of `product`.
    #[inline]
    pub fn book(&self, product: ProductId) -> Option<&OrderBook> {
        self.books.get(product.index())
    }

    /// Books in product order.
    pub fn books(&self) -> impl Iterator<Item = (ProductId, &OrderBook)> + '_ {
        self.books
            .iter()
            .enumerate()
            .map(|(idx, book)| (ProductId(idx as u32), book))
    }

    /// Position matrix.
    #[inline]
    pub fn positions(&self) -> &PositionMatrix {
        &self.positions
    }

    /// Fees collected so far.
    #[inline]
    pub fn total_fees(&self) -> u64 {
        self.total_fees
    }

    /// Configured fee multiplier.
    #[inline]
    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPU: ProductId = ProductId(0);
    const SELLER: TraderId = TraderId(0);
    const BUYER: TraderId = TraderId(1);

    fn all_connected(_: TraderId) -> bool {
        true
    }

    fn create_engine(fee_rate: FeeRate) -> MatchingEngine {
        MatchingEngine::new(2, 2, fee_rate)
    }

    fn order(id: u32, trader: TraderId, side: Side, qty: u64, price: u64) -> Order {
        Order::new(OrderId(id), trader, GPU, side, Price(price), Quantity(qty))
    }

    #[test]
    fn test_exact_match() {
        let rate = FeeRate::from_ppm(10_000);
        let mut engine = create_engine(rate);

        engine.submit(order(0, SELLER, Side::Sell, 10, 10)).unwrap();
        assert!(engine.try_match(GPU, &all_connected).unwrap().is_empty());

        engine.submit(order(0, BUYER, Side::Buy, 10, 10)).unwrap();
        let trades = engine.try_match(GPU, &all_connected).unwrap();

        assert_eq!(trades.len(), 1);
        let trade = trades[0];
        assert_eq!(trade.outcome, MatchOutcome::BothFilled);
        assert_eq!(trade.quantity, Quantity(10));
        assert_eq!(trade.value, 100);
        assert_eq!(trade.fee, 1);
        assert!(engine.book(GPU).unwrap().is_empty());

        let positions = engine.positions();
        assert_eq!(*positions.get(SELLER, GPU).unwrap(), Position { quantity: -10, cash: 99 });
        assert_eq!(*positions.get(BUYER, GPU).unwrap(), Position { quantity: 10, cash: -100 });
        assert_eq!(engine.total_fees(), 1);
    }

    #[test]
    fn test_partial_fill_keeps_resting_sell() {
        let mut engine = create_engine(FeeRate::ZERO);
        engine.submit(order(0, SELLER, Side::Sell, 10, 100)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 4, 100)).unwrap();

        let trades = engine.try_match(GPU, &all_connected).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].outcome, MatchOutcome::BuyFilled);
        assert_eq!(trades[0].quantity, Quantity(4));

        let book = engine.book(GPU).unwrap();
        assert!(book.peek_top(Side::Buy).is_none());
        let head = book.peek_top(Side::Sell).unwrap();
        assert_eq!(head.order_id, OrderId(0));
        assert_eq!(head.quantity, Quantity(6));

        let fills = trades[0].fills();
        assert_eq!(fills[0].trader, BUYER);
        assert_eq!(fills[1].trader, SELLER);
        assert!(fills.iter().all(|f| f.quantity == Quantity(4)));
    }

    #[test]
    fn test_buy_filled_uses_buy_price() {
        let mut engine = create_engine(FeeRate::ZERO);
        engine.submit(order(0, SELLER, Side::Sell, 10, 90)).unwrap();
        engine.submit(order(3, BUYER, Side::Buy, 4, 100)).unwrap();

        let trades = engine.try_match(GPU, &all_connected).unwrap();
        assert_eq!(trades[0].price, Price(100));
        assert_eq!(trades[0].value, 400);
    }

    #[test]
    fn test_sell_filled_uses_lower_order_id_price() {
        let mut engine = create_engine(FeeRate::ZERO);
        engine.submit(order(0, SELLER, Side::Sell, 3, 90)).unwrap();
        engine.submit(order(5, BUYER, Side::Buy, 10, 100)).unwrap();

        let trades = engine.try_match(GPU, &all_connected).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].outcome, MatchOutcome::SellFilled);
        assert_eq!(trades[0].price, Price(90));

        let head = *engine.book(GPU).unwrap().peek_top(Side::Buy).unwrap();
        assert_eq!(head.quantity, Quantity(7));
        assert!(engine.book(GPU).unwrap().peek_top(Side::Sell).is_none());
    }

    #[test]
    fn test_equal_order_ids_take_buy_price() {
        let mut engine = create_engine(FeeRate::ZERO);
        engine.submit(order(2, SELLER, Side::Sell, 5, 90)).unwrap();
        engine.submit(order(2, BUYER, Side::Buy, 5, 100)).unwrap();

        let trades = engine.try_match(GPU, &all_connected).unwrap();
        assert_eq!(trades[0].price, Price(100));
    }

    #[test]
    fn test_walks_multiple_levels() {
        let mut engine = create_engine(FeeRate::ZERO);
        engine.submit(order(0, SELLER, Side::Sell, 2, 100)).unwrap();
        engine.submit(order(1, SELLER, Side::Sell, 2, 101)).unwrap();
        engine.submit(order(2, SELLER, Side::Sell, 2, 105)).unwrap();
        engine.submit(order(9, BUYER, Side::Buy, 5, 102)).unwrap();

        let trades = engine.try_match(GPU, &all_connected).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sell_order, OrderId(0));
        assert_eq!(trades[1].sell_order, OrderId(1));

        let book = engine.book(GPU).unwrap();
        assert_eq!(book.peek_top(Side::Buy).unwrap().quantity, Quantity(1));
        assert_eq!(book.peek_top(Side::Sell).unwrap().price, Price(105));
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_no_cross_is_idempotent() {
        let mut engine = create_engine(FeeRate::ONE);
        engine.submit(order(0, SELLER, Side::Sell, 10, 101)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 10, 100)).unwrap();

        for _ in 0..3 {
            assert!(engine.try_match(GPU, &all_connected).unwrap().is_empty());
        }
        let book = engine.book(GPU).unwrap();
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.asks.len(), 1);
        assert_eq!(engine.total_fees(), 0);
    }

    #[test]
    fn test_disconnected_seller_credits_buyer_only() {
        let rate = FeeRate::from_ppm(10_000);
        let mut engine = create_engine(rate);
        engine.submit(order(0, SELLER, Side::Sell, 10, 10)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 10, 10)).unwrap();

        let seller_gone = |trader: TraderId| trader != SELLER;
        let trades = engine.try_match(GPU, &seller_gone).unwrap();
        assert_eq!(trades.len(), 1);

        let positions = engine.positions();
        assert_eq!(*positions.get(SELLER, GPU).unwrap(), Position::default());
        assert_eq!(*positions.get(BUYER, GPU).unwrap(), Position { quantity: 10, cash: -99 });
        assert_eq!(engine.total_fees(), 1);
    }

    #[test]
    fn test_disconnected_buyer_credits_seller_only() {
        let mut engine = create_engine(FeeRate::from_ppm(10_000));
        engine.submit(order(0, BUYER, Side::Buy, 10, 10)).unwrap();
        engine.submit(order(0, SELLER, Side::Sell, 10, 10)).unwrap();

        let buyer_gone = |trader: TraderId| trader != BUYER;
        engine.try_match(GPU, &buyer_gone).unwrap();

        let positions = engine.positions();
        assert_eq!(*positions.get(BUYER, GPU).unwrap(), Position::default());
        assert_eq!(*positions.get(SELLER, GPU).unwrap(), Position { quantity: -10, cash: 99 });
    }

    #[test]
    fn test_unit_fee_rate_takes_whole_value() {
        let mut engine = create_engine(FeeRate::ONE);
        engine.submit(order(0, SELLER, Side::Sell, 10, 10)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 10, 10)).unwrap();
        engine.try_match(GPU, &all_connected).unwrap();

        assert_eq!(engine.total_fees(), 100);
        assert_eq!(engine.positions().get(SELLER, GPU).unwrap().cash, 0);
    }

    #[test]
    fn test_matching_scoped_to_product() {
        let mut engine = create_engine(FeeRate::ZERO);
        let other = ProductId(1);
        engine
            .submit(Order::new(OrderId(0), SELLER, other, Side::Sell, Price(10), Quantity(1)))
            .unwrap();
        engine
            .submit(Order::new(OrderId(0), BUYER, other, Side::Buy, Price(10), Quantity(1)))
            .unwrap();

        assert!(engine.try_match(GPU, &all_connected).unwrap().is_empty());
        assert!(engine.book(other).unwrap().is_crossed());
        assert_eq!(engine.try_match(other, &all_connected).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_product_and_trader() {
        let mut engine = create_engine(FeeRate::ZERO);
        let bad = ProductId(7);
        assert_eq!(
            engine.submit(Order::new(OrderId(0), SELLER, bad, Side::Sell, Price(1), Quantity(1))),
            Err(EngineError::UnknownProduct(bad))
        );
        assert_eq!(
            engine.try_match(bad, &all_connected),
            Err(EngineError::UnknownProduct(bad))
        );

        engine.submit(order(0, TraderId(5), Side::Sell, 1, 1)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 1, 1)).unwrap();
        assert_eq!(
            engine.try_match(GPU, &all_connected),
            Err(EngineError::UnknownTrader(TraderId(5)))
        );
    }

    #[test]
    fn test_settlement_overflow_is_reported() {
        let mut engine = create_engine(FeeRate(u64::MAX));
        engine.submit(order(0, SELLER, Side::Sell, 999_999, 999_999)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 999_999, 999_999)).unwrap();

        assert_eq!(
            engine.try_match(GPU, &all_connected),
            Err(EngineError::SettlementOverflow(GPU))
        );
        assert_eq!(engine.total_fees(), 0);
        let positions = engine.positions();
        assert_eq!(*positions.get(SELLER, GPU).unwrap(), Position::default());
        assert_eq!(*positions.get(BUYER, GPU).unwrap(), Position::default());
    }

    #[test]
    fn test_largest_trade_at_max_rate_settles() {
        let mut engine = create_engine(FeeRate::MAX);
        engine.submit(order(0, SELLER, Side::Sell, 999_999, 999_999)).unwrap();
        engine.submit(order(0, BUYER, Side::Buy, 999_999, 999_999)).unwrap();

        let trades = engine.try_match(GPU, &all_connected).unwrap();
        let value = 999_999u64 * 999_999;
        assert_eq!(trades[0].fee, value * 1_000_000);
        assert_eq!(engine.total_fees(), value * 1_000_000);
        assert_eq!(
            engine.positions().get(SELLER, GPU).unwrap().cash,
            value as i64 - (value * 1_000_000) as i64
        );
    }
}
