//! Node-level failures. Engine errors pass through unchanged.

use skillswap_types::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("snapshot {path}: {reason}")]
    Snapshot { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

pub type NodeResult<T> = std::result::Result<T, NodeError>;
