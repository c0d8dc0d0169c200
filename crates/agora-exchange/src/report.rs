//! Order book and position snapshots.
//!
//! Read-only views rendered after every accepted order.

use agora_core::{MatchingEngine, PriceLevel, ProductRegistry, Side};
use tracing::info;

use crate::registry::TraderRegistry;

fn level_line(side: Side, level: &PriceLevel) -> String {
    let noun = if level.order_count == 1 { "order" } else { "orders" };
    format!(
        "\t\t{} {} @ ${} ({} {})",
        side, level.total_qty, level.price, level.order_count, noun
    )
}

/// `--ORDERBOOK--` section, products in registry order.
///
/// Sell levels come first, highest price first, followed by buy levels,
/// also highest price first.
pub fn orderbook_lines(products: &ProductRegistry, engine: &MatchingEngine) -> Vec<String> {
    let mut lines = vec!["--ORDERBOOK--".to_string()];

    for (product, name) in products.iter() {
        let Some(book) = engine.book(product) else {
            continue;
        };

        lines.push(format!(
            "\tProduct: {}; Buy levels: {}; Sell levels: {}",
            name,
            book.count_distinct_price_levels(Side::Buy),
            book.count_distinct_price_levels(Side::Sell),
        ));

        let asks: Vec<PriceLevel> = book.levels(Side::Sell).collect();
        lines.extend(asks.iter().rev().map(|l| level_line(Side::Sell, l)));
        lines.extend(book.levels(Side::Buy).map(|l| level_line(Side::Buy, &l)));
    }

    lines
}

/// `--POSITIONS--` section, one line per registered trader.
pub fn position_lines(
    products: &ProductRegistry,
    traders: &TraderRegistry,
    engine: &MatchingEngine,
) -> Vec<String> {
    let mut lines = vec!["--POSITIONS--".to_string()];

    for trader in traders.iter() {
        let Some(row) = engine.positions().row(trader.id) else {
            continue;
        };

        let holdings: Vec<String> = products
            .iter()
            .zip(row)
            .map(|((_, name), pos)| format!("{} {} (${})", name, pos.quantity, pos.cash))
            .collect();

        lines.push(format!("\tTrader {}: {}", trader.id, holdings.join(", ")));
    }

    lines
}

/// Log both sections under the report target.
pub fn log_snapshot(products: &ProductRegistry, traders: &TraderRegistry, engine: &MatchingEngine) {
    for line in orderbook_lines(products, engine)
        .into_iter()
        .chain(position_lines(products, traders, engine))
    {
        info!(target: "agora::report", "{}", line);
    }
}
