pub mod config;
pub mod error;
pub mod fragment;
pub mod occurrences;
pub mod patterns;
pub mod locator;
pub mod rewriter;
pub mod watcher;
pub mod metrics;
pub mod pipeline;

pub use config::*;
pub use error::*;
pub use fragment::*;
pub use occurrences::*;
pub use patterns::*;
pub use locator::*;
pub use rewriter::*;
pub use watcher::*;
pub use metrics::*;
pub use pipeline::*;

#[cfg(test)]
mod tests;
