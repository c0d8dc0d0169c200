//! Price level aggregation.
//!
//! A price level summarizes the adjacent orders of one book side that
//! share a price. Levels are derived on demand for reporting; the book
//! itself stores individual orders only.

use alloc::collections::vec_deque;
use core::iter::Peekable;
use crate::fixed::{Price, Quantity};
use crate::order::Order;

/// Summary of all resting orders at one price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price shared by every order in the level.
    pub price: Price,
    /// Total remaining quantity at this level.
    pub total_qty: Quantity,
    /// Number of orders at this level.
    pub order_count: usize,
}

impl PriceLevel {
    fn start(order: &Order) -> Self {
        Self {
            price: order.price,
            total_qty: order.quantity,
            order_count: 1,
        }
    }

    fn absorb(&mut self, order: &Order) {
        self.total_qty = self.total_qty.saturating_add(order.quantity);
        self.order_count += 1;
    }
}

/// Iterator over the price levels of a book side, head first.
pub struct Levels<'a> {
    orders: Peekable<vec_deque::Iter<'a, Order>>,
}

impl<'a> Levels<'a> {
    pub(crate) fn new(orders: vec_deque::Iter<'a, Order>) -> Self {
        Self {
            orders: orders.peekable(),
        }
    }
}

impl<'a> Iterator for Levels<'a> {
    type Item = PriceLevel;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.orders.next()?;
        let mut level = PriceLevel::start(first);
        while let Some(order) = self.orders.next_if(|o| o.price == level.price) {
            level.absorb(order);
        }
        Some(level)
    }
}
