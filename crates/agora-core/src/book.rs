//! Order book data structures.
//!
//! Each product has two owned sequences of resting orders. The head of a
//! sequence is the order matched first.
//!
//! Ordering rules:
//! - Buy side: descending price. A new order at an existing price goes
//!   behind the orders already resting at that price.
//! - Sell side: ascending price. A new order at an existing price goes
//!   ahead of the orders already resting at that price.
//!
//! The two tie-breaks are deliberately not symmetric and are kept
//! independently testable.

use alloc::collections::VecDeque;
use crate::fixed::Quantity;
use crate::level::Levels;
use crate::order::{Order, Side};

/// One side of the order book (Bids or Asks).
#[derive(Clone, Debug)]
pub struct BookSide {
    /// Resting orders, highest priority first.
    orders: VecDeque<Order>,
    /// Side indicator for price comparison.
    side: Side,
}

impl BookSide {
    /// Create a new, empty book side.
    pub fn new(side: Side) -> Self {
        Self {
            orders: VecDeque::new(),
            side,
        }
    }

    /// Position at which `order` must be inserted, scanning from the head.
    fn insertion_point(&self, order: &Order) -> usize {
        let price = order.price;
        let pos = match self.side {
            // Skip everything priced at or above: equal prices stay ahead.
            Side::Buy => self.orders.iter().position(|o| o.price < price),
            // Skip only strictly cheaper orders: resting equal prices end up behind.
            Side::Sell => self.orders.iter().position(|o| o.price >= price),
        };
        pos.unwrap_or(self.orders.len())
    }

    /// Insert an order per this side's ordering rule. O(depth).
    pub fn insert(&mut self, order: Order) {
        debug_assert_eq!(order.side, self.side, "order inserted on wrong side");
        let idx = self.insertion_point(&order);
        self.orders.insert(idx, order);
    }

    /// Highest-priority order.
    #[inline(always)]
    pub fn peek_top(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Remove the highest-priority order.
    #[inline]
    pub fn pop_top(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Reduce the head order's quantity in place; never removes it.
    ///
    /// Returns the remaining quantity, or `None` if the side is empty.
    #[inline]
    pub fn reduce_top(&mut self, by: Quantity) -> Option<Quantity> {
        let head = self.orders.front_mut()?;
        head.fill(by);
        Some(head.quantity)
    }

    /// Number of distinct prices present.
    pub fn count_distinct_price_levels(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for order in &self.orders {
            if last != Some(order.price) {
                count += 1;
                last = Some(order.price);
            }
        }
        count
    }

    /// Aggregated price levels, head first.
    pub fn levels(&self) -> Levels<'_> {
        Levels::new(self.orders.iter())
    }

    /// Resting orders, head first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Order> + '_ {
        self.orders.iter()
    }

    /// Number of resting orders.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check if side is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Total quantity on this side.
    pub fn total_qty(&self) -> Quantity {
        self.orders
            .iter()
            .fold(Quantity::ZERO, |acc, o| acc.saturating_add(o.quantity))
    }
}

/// The complete order book for a single product.
#[derive(Clone, Debug)]
pub struct OrderBook {
    /// Bid side (buyers).
    pub bids: BookSide,
    /// Ask side (sellers).
    pub asks: BookSide,
}

impl OrderBook {
    /// Create a new, empty order book.
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
        }
    }

    /// Insert an order on the side it names.
    #[inline]
    pub fn insert(&mut self, order: Order) {
        self.side_mut(order.side).insert(order);
    }

    /// Highest-priority order on `side`.
    #[inline(always)]
    pub fn peek_top(&self, side: Side) -> Option<&Order> {
        self.side(side).peek_top()
    }

    /// Remove the highest-priority order on `side`.
    #[inline]
    pub fn pop_top(&mut self, side: Side) -> Option<Order> {
        self.side_mut(side).pop_top()
    }

    /// Reduce the head order on `side` without removing it.
    #[inline]
    pub fn reduce_top(&mut self, side: Side, by: Quantity) -> Option<Quantity> {
        self.side_mut(side).reduce_top(by)
    }

    /// Distinct prices on `side`.
    #[inline]
    pub fn count_distinct_price_levels(&self, side: Side) -> usize {
        self.side(side).count_distinct_price_levels()
    }

    /// Aggregated price levels on `side`, head first.
    #[inline]
    pub fn levels(&self, side: Side) -> Levels<'_> {
        self.side(side).levels()
    }

    /// Resting orders on `side`.
    #[inline(always)]
    pub fn len(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Check if book is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// True when the best bid is priced at or above the best ask.
    pub fn is_crossed(&self) -> bool {
        match (self.bids.peek_top(), self.asks.peek_top()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Get mutable reference to appropriate side.
    #[inline(always)]
    pub fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Get immutable reference to appropriate side.
    #[inline(always)]
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
