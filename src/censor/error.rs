//! Error types for the censoring engine

use thiserror::Error;

use crate::dom::DomError;
use crate::store::StoreError;

/// The main error type for censor operations.
#[derive(Debug, Error)]
pub enum CensorError {
    /// A configured pattern failed to compile. Raised at configuration load.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A configured pattern has no replacement text.
    #[error("pattern `{0}` has an empty replacement")]
    EmptyReplacement(String),

    /// The host DOM rejected an operation.
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    /// The key-value store failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Stored metrics could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
