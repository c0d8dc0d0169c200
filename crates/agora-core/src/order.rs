//! Order types and identifiers.

use core::fmt;
use crate::fixed::{Price, Quantity};

/// Side of the order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid side (buyers).
    Buy = 0,
    /// Ask side (sellers).
    Sell = 1,
}

impl Side {
    /// Check if this is the buy side.
    #[inline(always)]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }

    /// Wire keyword for this side.
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a product in the product registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct ProductId(pub u32);

impl ProductId {
    /// Index into per-product tables.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Trader identifier, assigned in launch order starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct TraderId(pub u32);

impl TraderId {
    /// Index into per-trader tables.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trader-chosen order identifier.
///
/// Unique per trader and side only: two traders (or the two sides of one
/// trader) reuse the same values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct OrderId(pub u32);

impl OrderId {
    /// The id that must follow this one.
    #[inline(always)]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resting limit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    /// Trader-assigned identifier.
    pub order_id: OrderId,
    /// Owner of the order.
    pub trader: TraderId,
    /// Product the order trades.
    pub product: ProductId,
    /// Remaining quantity to fill.
    pub quantity: Quantity,
    /// Limit price.
    pub price: Price,
    /// Order side (buy/sell).
    pub side: Side,
}

impl Order {
    /// Create a new order.
    #[inline(always)]
    pub fn new(
        order_id: OrderId,
        trader: TraderId,
        product: ProductId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            order_id,
            trader,
            product,
            quantity,
            price,
            side,
        }
    }

    /// Fill the order by the given quantity.
    ///
    /// # Panics
    /// Debug-panics if qty > quantity.
    #[inline(always)]
    pub fn fill(&mut self, qty: Quantity) {
        debug_assert!(qty.0 <= self.quantity.0, "Fill quantity exceeds remaining");
        self.quantity = self.quantity.saturating_sub(qty);
    }
}
