//! censor-core: live vocabulary rewriting for web pages
//!
//! A Rust/WASM engine that rewrites job-related vocabulary in a page's visible
//! text to obscured forms, keeps doing so as the DOM mutates, and records
//! aggregate counters of what it rewrote.
//!
//! # Architecture
//!
//! ## Censor Components
//! - `patterns.rs` - PatternTable: ordered word-boundary substitutions + tag exclusions
//! - `locator.rs` - TextLocator: lazy walk over eligible text segments
//! - `rewriter.rs` - Rewriter: swaps a segment for a marked container, installs the stylesheet
//! - `watcher.rs` - ChangeWatcher: Stopped/Observing state machine over insertion batches
//! - `metrics.rs` - MetricsSink: folds occurrence maps into stored totals
//! - `pipeline.rs` - CensorPipeline: toggle, full passes, mutation batches
//!
//! ## Hosts
//! - `dom` - DomHost trait + ArenaDom (in-memory tree)
//! - `store` - KeyValueStore trait + MemoryStore
//! - `web` (wasm32) - WebDom, LocalStore and the `JobCensor` JS class
//!
//! # Usage (native)
//! ```rust
//! use censor_core::{ArenaDom, CensorConfig, CensorPipeline, MemoryStore};
//!
//! let mut dom = ArenaDom::new();
//! let body = dom.body_id();
//! let p = dom.append_element(body, "p");
//! dom.append_text(p, "Apply for this job today");
//!
//! let mut pipeline = CensorPipeline::new(dom, MemoryStore::new(), CensorConfig::default())?;
//! pipeline.activate();
//!
//! let dom = pipeline.dom();
//! assert_eq!(dom.text_content(dom.body_id()), "Apply for this j*b today");
//! # Ok::<(), censor_core::CensorError>(())
//! ```
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { JobCensor } from 'censor-core';
//!
//! await init();
//! const censor = new JobCensor();
//! censor.start();
//! console.log(censor.getSummary());   // { total_words, most_blocked, ranked, ... }
//! ```

pub mod censor;
pub mod dom;
pub mod logging;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod web;

// Public exports - Censor
pub use censor::*;

// Public exports - Hosts
pub use dom::*;
pub use store::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Install the panic hook and the console logger
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("censor-core v{}", env!("CARGO_PKG_VERSION"))
}
