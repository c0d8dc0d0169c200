//! Frame splitting and inbound message parsing.

use arrayvec::ArrayVec;
use crate::messages::*;

/// Number of whitespace-separated fields in a BUY/SELL message.
pub const ORDER_FIELDS: usize = 5;

/// Inbound message parser.
pub struct MessageParser;

impl MessageParser {
    /// Split the first complete frame off `buffer`.
    ///
    /// Returns the frame without its terminator and the number of bytes
    /// consumed (terminator included), or `None` if no terminator has
    /// arrived yet.
    #[inline]
    pub fn split_frame(buffer: &[u8]) -> Option<(&[u8], usize)> {
        let end = buffer.iter().position(|&b| b == DELIMITER)?;
        Some((&buffer[..end], end + 1))
    }

    /// Strip surrounding whitespace and an optional trailing terminator.
    fn body(message: &str) -> &str {
        let message = message.trim();
        message
            .strip_suffix(DELIMITER as char)
            .unwrap_or(message)
            .trim_end()
    }

    /// Classify a message by its leading token.
    pub fn classify(message: &str) -> CommandKind {
        Self::body(message)
            .split_ascii_whitespace()
            .next()
            .map_or(CommandKind::Unknown, CommandKind::from_token)
    }

    /// Parse `<side> <order_id> <product> <quantity> <price>`.
    ///
    /// Requires exactly five fields with numeric id, quantity and price.
    /// Ranges are left to the caller so it can check them after
    /// resolving the product.
    pub fn parse_order(message: &str) -> Result<OrderMessage<'_>, Reject> {
        let mut fields: ArrayVec<&str, ORDER_FIELDS> = ArrayVec::new();
        for field in Self::body(message).split_ascii_whitespace() {
            fields.try_push(field).map_err(|_| Reject::Malformed)?;
        }

        if !fields.is_full() {
            return Err(Reject::Malformed);
        }

        let side = CommandKind::from_token(fields[0])
            .side()
            .ok_or(Reject::Malformed)?;

        Ok(OrderMessage {
            side,
            order_id: Self::number(fields[1])?,
            product: fields[2],
            quantity: Self::number(fields[3])?,
            price: Self::number(fields[4])?,
        })
    }

    #[inline]
    fn number(field: &str) -> Result<i64, Reject> {
        field.parse::<i64>().map_err(|_| Reject::Malformed)
    }
}
