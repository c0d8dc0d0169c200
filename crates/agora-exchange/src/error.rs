use std::io;
use std::path::PathBuf;

use agora_core::{EngineError, TraderId};
use agora_net::ChannelId;
use thiserror::Error;

/// Fatal exchange errors. Protocol violations by traders are not errors;
/// they are answered with `INVALID;` and never reach this type.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Product file line {line}: {reason}")]
    ProductFile { line: usize, reason: String },

    #[error("Duplicate trader id: {0}")]
    DuplicateTrader(TraderId),

    #[error("Duplicate product: {0}")]
    DuplicateProduct(String),

    #[error("Event from unknown channel {0}")]
    UnknownChannel(ChannelId),

    #[error("Unknown trader: {0}")]
    UnknownTrader(TraderId),

    #[error("Matching engine: {0}")]
    Engine(EngineError),

    #[error("Failed to launch trader {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Transport closed with traders still connected")]
    TransportClosed,

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] agora_metrics::CreationError),
}

impl From<EngineError> for ExchangeError {
    fn from(err: EngineError) -> Self {
        ExchangeError::Engine(err)
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
