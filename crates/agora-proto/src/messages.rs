//! Message definitions.
//!
//! Inbound (trader → exchange):
//! - `BUY <order_id> <product> <quantity> <price>;`
//! - `SELL <order_id> <product> <quantity> <price>;`
//! - `AMMEND ...;` and `CANCEL ...;` (recognized, no effect)
//!
//! Outbound (exchange → trader):
//! - `MARKET OPEN;`
//! - `ACCEPTED <order_id>;`
//! - `MARKET <BUY|SELL> <product> <quantity> <price>;`
//! - `FILL <order_id> <quantity>;`
//! - `INVALID;`

use alloc::string::{String, ToString};
use core::fmt;
use agora_core::{OrderId, Price, Quantity, Side};

/// Message terminator.
pub const DELIMITER: u8 = b';';

/// Longest inbound message accepted, excluding the terminator.
pub const MAX_MESSAGE_LEN: usize = 128;

/// Largest legal order id (ids start at 0).
pub const ORDER_ID_MAX: i64 = 999_999;

/// Smallest legal quantity.
pub const QUANTITY_MIN: i64 = 1;

/// Largest legal quantity.
pub const QUANTITY_MAX: i64 = 999_999;

/// Smallest legal price.
pub const PRICE_MIN: i64 = 1;

/// Largest legal price.
pub const PRICE_MAX: i64 = 999_999;

/// Inbound command, classified by its leading token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// New buy order.
    Buy,
    /// New sell order.
    Sell,
    /// Order amendment. Spelled `AMMEND` on the wire.
    Amend,
    /// Order cancellation.
    Cancel,
    /// Anything else.
    Unknown,
}

impl CommandKind {
    /// Classify a leading token. Matching is exact and case-sensitive.
    pub fn from_token(token: &str) -> Self {
        match token {
            "BUY" => CommandKind::Buy,
            "SELL" => CommandKind::Sell,
            "AMMEND" => CommandKind::Amend,
            "CANCEL" => CommandKind::Cancel,
            _ => CommandKind::Unknown,
        }
    }

    /// Order side, for `BUY`/`SELL`.
    pub fn side(self) -> Option<Side> {
        match self {
            CommandKind::Buy => Some(Side::Buy),
            CommandKind::Sell => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Why an inbound message was answered with `INVALID;`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reject {
    /// Wrong token count or a non-numeric numeric field.
    Malformed,
    /// Leading token is not a known command.
    UnknownCommand,
    /// Product name not in the registry.
    UnknownProduct,
    /// Order id outside `[0, ORDER_ID_MAX]`.
    OrderIdOutOfRange,
    /// Quantity outside `[QUANTITY_MIN, QUANTITY_MAX]`.
    QuantityOutOfRange,
    /// Price outside `[PRICE_MIN, PRICE_MAX]`.
    PriceOutOfRange,
    /// Order id is not the trader's next expected id for that side.
    OutOfSequence,
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Reject::Malformed => "malformed message",
            Reject::UnknownCommand => "unknown command",
            Reject::UnknownProduct => "unknown product",
            Reject::OrderIdOutOfRange => "order id out of range",
            Reject::QuantityOutOfRange => "quantity out of range",
            Reject::PriceOutOfRange => "price out of range",
            Reject::OutOfSequence => "order id out of sequence",
        };
        f.write_str(reason)
    }
}

/// A syntactically valid BUY/SELL message. Ranges are not yet checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderMessage<'a> {
    /// Order side.
    pub side: Side,
    /// Order id as sent.
    pub order_id: i64,
    /// Product name as sent.
    pub product: &'a str,
    /// Quantity as sent.
    pub quantity: i64,
    /// Price as sent.
    pub price: i64,
}

impl<'a> OrderMessage<'a> {
    /// Order id, if within the legal range.
    pub fn checked_order_id(&self) -> Result<OrderId, Reject> {
        if (0..=ORDER_ID_MAX).contains(&self.order_id) {
            Ok(OrderId(self.order_id as u32))
        } else {
            Err(Reject::OrderIdOutOfRange)
        }
    }

    /// Quantity, if within the legal range.
    pub fn checked_quantity(&self) -> Result<Quantity, Reject> {
        if (QUANTITY_MIN..=QUANTITY_MAX).contains(&self.quantity) {
            Ok(Quantity(self.quantity as u64))
        } else {
            Err(Reject::QuantityOutOfRange)
        }
    }

    /// Price, if within the legal range.
    pub fn checked_price(&self) -> Result<Price, Reject> {
        if (PRICE_MIN..=PRICE_MAX).contains(&self.price) {
            Ok(Price(self.price as u64))
        } else {
            Err(Reject::PriceOutOfRange)
        }
    }
}

/// Exchange → trader message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outbound<'a> {
    /// Trading has started.
    MarketOpen,
    /// The recipient's order was accepted.
    Accepted(OrderId),
    /// Another trader placed an order.
    Market {
        side: Side,
        product: &'a str,
        quantity: Quantity,
        price: Price,
    },
    /// The recipient's order traded.
    Fill { order_id: OrderId, quantity: Quantity },
    /// The recipient's last message was rejected.
    Invalid,
}

impl<'a> Outbound<'a> {
    /// Wire encoding, terminator included.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl<'a> fmt::Display for Outbound<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::MarketOpen => f.write_str("MARKET OPEN;"),
            Outbound::Accepted(id) => write!(f, "ACCEPTED {};", id),
            Outbound::Market { side, product, quantity, price } => {
                write!(f, "MARKET {} {} {} {};", side, product, quantity, price)
            }
            Outbound::Fill { order_id, quantity } => write!(f, "FILL {} {};", order_id, quantity),
            Outbound::Invalid => f.write_str("INVALID;"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_encoding() {
        assert_eq!(Outbound::MarketOpen.encode(), "MARKET OPEN;");
        assert_eq!(Outbound::Accepted(OrderId(7)).encode(), "ACCEPTED 7;");
        assert_eq!(
            Outbound::Market {
                side: Side::Sell,
                product: "GPU",
                quantity: Quantity(30),
                price: Price(511),
            }
            .encode(),
            "MARKET SELL GPU 30 511;"
        );
        assert_eq!(
            Outbound::Fill { order_id: OrderId(0), quantity: Quantity(4) }.encode(),
            "FILL 0 4;"
        );
        assert_eq!(Outbound::Invalid.encode(), "INVALID;");
    }

    #[test]
    fn test_command_classification() {
        assert_eq!(CommandKind::from_token("BUY"), CommandKind::Buy);
        assert_eq!(CommandKind::from_token("SELL"), CommandKind::Sell);
        assert_eq!(CommandKind::from_token("AMMEND"), CommandKind::Amend);
        assert_eq!(CommandKind::from_token("AMEND"), CommandKind::Unknown);
        assert_eq!(CommandKind::from_token("CANCEL"), CommandKind::Cancel);
        assert_eq!(CommandKind::from_token("buy"), CommandKind::Unknown);
        assert_eq!(CommandKind::Sell.side(), Some(Side::Sell));
        assert_eq!(CommandKind::Cancel.side(), None);
    }

    #[test]
    fn test_range_checks() {
        let mut msg = OrderMessage {
            side: Side::Buy,
            order_id: 999_999,
            product: "GPU",
            quantity: 1,
            price: 999_999,
        };
        assert_eq!(msg.checked_order_id(), Ok(OrderId(999_999)));
        assert_eq!(msg.checked_quantity(), Ok(Quantity(1)));
        assert_eq!(msg.checked_price(), Ok(Price(999_999)));

        msg.order_id = 1_000_000;
        msg.quantity = 0;
        msg.price = -3;
        assert_eq!(msg.checked_order_id(), Err(Reject::OrderIdOutOfRange));
        assert_eq!(msg.checked_quantity(), Err(Reject::QuantityOutOfRange));
        assert_eq!(msg.checked_price(), Err(Reject::PriceOutOfRange));

        msg.order_id = -1;
        assert_eq!(msg.checked_order_id(), Err(Reject::OrderIdOutOfRange));
    }
}
