//! Text wire protocol between the exchange and its traders.
//!
//! Every message is ASCII, fields separated by spaces, terminated by `;`.
//! Parsing borrows from the input frame; encoding allocates the outbound
//! line.

#![no_std]

extern crate alloc;

pub mod messages;
pub mod parser;

pub use messages::*;
pub use parser::*;
