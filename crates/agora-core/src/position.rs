//! Per-trader, per-product positions.

use alloc::vec;
use alloc::vec::Vec;
use crate::order::{ProductId, TraderId};

/// Net product quantity and net cash accumulated from trades.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Units bought minus units sold.
    pub quantity: i64,
    /// Cash received minus cash paid.
    pub cash: i64,
}

impl Position {
    /// Record a purchase of `quantity` units costing `cost`.
    ///
    /// Returns `None` and leaves the position untouched on overflow.
    #[inline]
    #[must_use]
    pub fn buy(&mut self, quantity: u64, cost: i64) -> Option<()> {
        let quantity = self.quantity.checked_add(i64::try_from(quantity).ok()?)?;
        let cash = self.cash.checked_sub(cost)?;
        *self = Self { quantity, cash };
        Some(())
    }

    /// Record a sale of `quantity` units raising `proceeds`.
    ///
    /// Returns `None` and leaves the position untouched on overflow.
    #[inline]
    #[must_use]
    pub fn sell(&mut self, quantity: u64, proceeds: i64) -> Option<()> {
        let quantity = self.quantity.checked_sub(i64::try_from(quantity).ok()?)?;
        let cash = self.cash.checked_add(proceeds)?;
        *self = Self { quantity, cash };
        Some(())
    }
}

/// `traders × products` table of positions, zeroed at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionMatrix {
    cells: Vec<Position>,
    traders: usize,
    products: usize,
}

impl PositionMatrix {
    /// Create a zeroed matrix.
    pub fn new(traders: usize, products: usize) -> Self {
        Self {
            cells: vec![Position::default(); traders * products],
            traders,
            products,
        }
    }

    /// Number of trader rows.
    #[inline(always)]
    pub fn trader_count(&self) -> usize {
        self.traders
    }

    /// Number of product columns.
    #[inline(always)]
    pub fn product_count(&self) -> usize {
        self.products
    }

    #[inline(always)]
    fn offset(&self, trader: TraderId, product: ProductId) -> Option<usize> {
        if trader.index() < self.traders && product.index() < self.products {
            Some(trader.index() * self.products + product.index())
        } else {
            None
        }
    }

    /// Position of `trader` in `product`.
    pub fn get(&self, trader: TraderId, product: ProductId) -> Option<&Position> {
        self.offset(trader, product).map(|idx| &self.cells[idx])
    }

    /// Mutable position of `trader` in `product`.
    pub fn get_mut(&mut self, trader: TraderId, product: ProductId) -> Option<&mut Position> {
        self.offset(trader, product).map(move |idx| &mut self.cells[idx])
    }

    /// All positions of `trader`, in product order.
    pub fn row(&self, trader: TraderId) -> Option<&[Position]> {
        if trader.index() >= self.traders {
            return None;
        }
        let start = trader.index() * self.products;
        Some(&self.cells[start..start + self.products])
    }
}
