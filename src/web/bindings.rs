//! JobCensor: JS entry point for the content script
//!
//! ```javascript,ignore
//! import init, { JobCensor } from 'censor-core';
//!
//! await init();
//! const censor = new JobCensor();          // or new JobCensor({ patterns: [...] })
//! censor.start();                          // reads the toggle, rewrites, observes
//!
//! chrome.storage.onChanged.addListener((changes) => {
//!   for (const [key, { newValue }] of Object.entries(changes)) {
//!     censor.onStorageChange(key, newValue);
//!   }
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::censor::config::CensorConfig;
use crate::censor::pipeline::CensorPipeline;
use crate::store::StorageChange;

use super::dom::WebDom;
use super::store::LocalStore;

type WebPipeline = CensorPipeline<WebDom, LocalStore>;

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Plain objects rather than JS `Map`s, so the popup can read them as-is
fn to_plain<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(to_js)
}

#[wasm_bindgen]
pub struct JobCensor {
    pipeline: Rc<RefCell<WebPipeline>>,
}

#[wasm_bindgen]
impl JobCensor {
    /// Create a censor for the current page. `config` is optional; missing
    /// fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn js_new(config: JsValue) -> Result<JobCensor, JsValue> {
        crate::logging::init();

        let config: CensorConfig = if config.is_undefined() || config.is_null() {
            CensorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?
        };

        let dom = WebDom::from_window().map_err(to_js)?;
        let batches = dom.batch_slot();
        let store = LocalStore::from_window().map_err(to_js)?;
        let pipeline = Rc::new(RefCell::new(
            CensorPipeline::new(dom, store, config).map_err(to_js)?,
        ));

        let weak = Rc::downgrade(&pipeline);
        batches.set_handler(move |records| {
            let Some(pipeline) = weak.upgrade() else {
                return;
            };
            match pipeline.try_borrow_mut() {
                Ok(mut pipeline) => {
                    pipeline.handle_mutations(&records);
                }
                Err(_) => warn!("[JobCensor] pipeline busy, mutation batch dropped"),
            };
        });

        Ok(JobCensor { pipeline })
    }

    /// Read the toggle and either rewrite + observe or stay idle
    #[wasm_bindgen(js_name = "start")]
    pub fn js_start(&self) {
        self.pipeline.borrow_mut().activate();
    }

    /// Stop observing. The toggle is left as is.
    #[wasm_bindgen(js_name = "stop")]
    pub fn js_stop(&self) {
        self.pipeline.borrow_mut().stop();
    }

    /// Forward a storage change notification
    #[wasm_bindgen(js_name = "onStorageChange")]
    pub fn js_on_storage_change(&self, key: &str, new_value: JsValue) -> Result<(), JsValue> {
        let new_value: Option<Value> = if new_value.is_undefined() {
            None
        } else {
            serde_wasm_bindgen::from_value(new_value).map_err(to_js)?
        };
        self.pipeline
            .borrow_mut()
            .handle_storage_change(&StorageChange::new(key, None, new_value));
        Ok(())
    }

    /// Persist and apply the toggle (popup switch)
    #[wasm_bindgen(js_name = "setProtection")]
    pub fn js_set_protection(&self, enabled: bool) -> Result<(), JsValue> {
        self.pipeline
            .borrow_mut()
            .set_protection(enabled)
            .map_err(to_js)
    }

    /// Run one full pass now. Returns `{ word: count }` for what was replaced.
    #[wasm_bindgen(js_name = "processPage")]
    pub fn js_process_page(&self) -> Result<JsValue, JsValue> {
        let occurrences = self.pipeline.borrow_mut().process_page();
        to_plain(&occurrences)
    }

    #[wasm_bindgen(js_name = "isEnabled")]
    pub fn js_is_enabled(&self) -> bool {
        self.pipeline.borrow().is_enabled()
    }

    #[wasm_bindgen(js_name = "isObserving")]
    pub fn js_is_observing(&self) -> bool {
        self.pipeline.borrow().subscription().is_some()
    }

    #[wasm_bindgen(js_name = "watchState")]
    pub fn js_watch_state(&self) -> String {
        self.pipeline.borrow().watch_state().as_str().to_string()
    }

    /// Stored aggregate, in the layout the popup reads
    #[wasm_bindgen(js_name = "getMetrics")]
    pub fn js_get_metrics(&self) -> Result<JsValue, JsValue> {
        let metrics = self.pipeline.borrow().metrics().map_err(to_js)?;
        to_plain(&metrics)
    }

    /// Totals, most-blocked word and ranking for display
    #[wasm_bindgen(js_name = "getSummary")]
    pub fn js_get_summary(&self) -> Result<JsValue, JsValue> {
        let summary = self.pipeline.borrow().summary().map_err(to_js)?;
        to_plain(&summary)
    }
}
