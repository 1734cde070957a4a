//! Browser host (wasm32 only)
//!
//! - `dom.rs` - WebDom: [`DomHost`](crate::dom::DomHost) over `web_sys`
//! - `store.rs` - LocalStore: `window.localStorage` as a JSON key-value store
//! - `bindings.rs` - JobCensor: the `#[wasm_bindgen]` surface for the content script

pub mod bindings;
pub mod dom;
pub mod store;

pub use bindings::*;
pub use dom::*;
pub use store::*;

use wasm_bindgen::JsValue;

/// Render a JS exception for error messages
pub(crate) fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}
