//! Property-based tests for order book invariants.
//!
//! - Each side stays sorted by price in its own direction
//! - Same-price ties follow each side's arrival rule
//! - Matching always leaves the book uncrossed
//! - Quantity is conserved across fills

use agora_core::{
    FeeRate, MatchingEngine, Order, OrderBook, OrderId, Price, ProductId, Quantity, Side, TraderId,
};
use proptest::prelude::*;

fn arb_price() -> impl Strategy<Value = u64> {
    1u64..20u64
}

fn arb_quantity() -> impl Strategy<Value = u64> {
    1u64..50u64
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn make_order(id: u32, trader: u32, side: Side, price: u64, qty: u64) -> Order {
    Order::new(
        OrderId(id),
        TraderId(trader),
        ProductId(0),
        side,
        Price(price),
        Quantity(qty),
    )
}

proptest! {
    #[test]
    fn prop_buy_side_descending_fifo(prices in prop::collection::vec(arb_price(), 1..40)) {
        let mut book = OrderBook::new();
        for (i, &price) in prices.iter().enumerate() {
            book.insert(make_order(i as u32, 0, Side::Buy, price, 1));
        }

        let orders: Vec<&Order> = book.bids.iter().collect();
        for pair in orders.windows(2) {
            prop_assert!(pair[0].price >= pair[1].price);
            if pair[0].price == pair[1].price {
                // Earlier arrival (lower id here) stays ahead.
                prop_assert!(pair[0].order_id < pair[1].order_id);
            }
        }
        prop_assert_eq!(book.bids.len(), prices.len());
    }

    #[test]
    fn prop_sell_side_ascending_newest_first(prices in prop::collection::vec(arb_price(), 1..40)) {
        let mut book = OrderBook::new();
        for (i, &price) in prices.iter().enumerate() {
            book.insert(make_order(i as u32, 0, Side::Sell, price, 1));
        }

        let orders: Vec<&Order> = book.asks.iter().collect();
        for pair in orders.windows(2) {
            prop_assert!(pair[0].price <= pair[1].price);
            if pair[0].price == pair[1].price {
                // Later arrival (higher id here) ranks ahead.
                prop_assert!(pair[0].order_id > pair[1].order_id);
            }
        }
    }

    #[test]
    fn prop_distinct_levels_match_unique_prices(prices in prop::collection::vec(arb_price(), 0..40)) {
        let mut book = OrderBook::new();
        for (i, &price) in prices.iter().enumerate() {
            book.insert(make_order(i as u32, 0, Side::Buy, price, 1));
        }

        let mut unique = prices.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(book.count_distinct_price_levels(Side::Buy), unique.len());
        prop_assert_eq!(book.bids.levels().count(), unique.len());
    }

    #[test]
    fn prop_matching_leaves_book_uncrossed(
        orders in prop::collection::vec((arb_side(), arb_price(), arb_quantity()), 1..60)
    ) {
        let mut engine = MatchingEngine::new(1, 2, FeeRate::ZERO);
        let connected = |_: TraderId| true;
        let product = ProductId(0);

        let mut submitted = 0u64;
        let mut traded = 0u64;
        for (i, &(side, price, qty)) in orders.iter().enumerate() {
            let trader = if side.is_buy() { 0 } else { 1 };
            engine.submit(make_order(i as u32, trader, side, price, qty)).unwrap();
            submitted += qty;

            for trade in engine.try_match(product, &connected).unwrap() {
                prop_assert!(!trade.quantity.is_zero());
                traded += trade.quantity.as_raw();
            }
            prop_assert!(!engine.book(product).unwrap().is_crossed());
        }

        let book = engine.book(product).unwrap();
        let resting = book.bids.total_qty().as_raw() + book.asks.total_qty().as_raw();
        prop_assert_eq!(resting + 2 * traded, submitted);

        let positions = engine.positions();
        let net: i64 = (0..2)
            .map(|t| positions.get(TraderId(t), product).unwrap().quantity)
            .sum();
        prop_assert_eq!(net, 0);
    }
}
