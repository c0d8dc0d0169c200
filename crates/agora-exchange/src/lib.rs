//! Agora exchange.
//!
//! Accepts orders from local trader processes over pipes, matches them
//! under price/time priority and reports fills, positions and fees.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod exchange;
pub mod registry;
pub mod report;

pub use config::Cli;
pub use error::{ExchangeError, Result};
pub use exchange::{validate_order, Exchange, Settlement};
pub use registry::{Trader, TraderRegistry};
