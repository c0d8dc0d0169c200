//! # Agora Core
//!
//! Order book and matching engine for a continuous-auction exchange.
//!
//! ## Design Principles
//! - Integer arithmetic only (no floats), fee rate in fixed point
//! - Single-threaded: the caller serializes every mutation
//! - Matching runs per product, only when the caller asks
//! - Invariant violations surface as [`EngineError`], never as panics

#![no_std]

extern crate alloc;

pub mod fixed;
pub mod order;
pub mod product;
pub mod level;
pub mod book;
pub mod position;
pub mod engine;

pub use fixed::{FeeRate, Price, Quantity};
pub use order::{Order, OrderId, ProductId, Side, TraderId};
pub use product::ProductRegistry;
pub use level::{Levels, PriceLevel};
pub use book::{BookSide, OrderBook};
pub use position::{Position, PositionMatrix};
pub use engine::{EngineError, Fill, Liveness, MatchOutcome, MatchingEngine, Trade};
