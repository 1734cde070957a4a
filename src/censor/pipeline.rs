//! CensorPipeline: the page-level coordinator
//!
//! Owns the DOM host, the store-backed metrics sink, the rewriting components
//! and the enable flag. Entry points:
//! - `activate()` - read the toggle, then full pass + watcher, or stop
//! - `process_page()` - one full-document pass
//! - `handle_mutations()` - one delivered mutation batch
//! - `handle_storage_change()` / `set_protection()` - toggle updates
//!
//! None of them fail: DOM and storage problems are logged and the pass
//! degrades to "no visible change".

use instant::Instant;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dom::{DomHost, MutationRecord};
use crate::store::{KeyValueStore, StorageChange};

use super::config::CensorConfig;
use super::error::CensorError;
use super::locator::TextLocator;
use super::metrics::{Metrics, MetricsSink, MetricsSummary, PassKind, RecordContext, StoreSink};
use super::occurrences::OccurrenceMap;
use super::rewriter::Rewriter;
use super::watcher::{ChangeWatcher, WatchState};

/// Missing, `null` or any value other than `false` means enabled
pub fn protection_from_value(value: Option<&Value>) -> bool {
    !matches!(value, Some(Value::Bool(false)))
}

pub struct CensorPipeline<D: DomHost, S: KeyValueStore> {
    dom: D,
    sink: StoreSink<S>,
    locator: TextLocator,
    rewriter: Rewriter,
    watcher: ChangeWatcher<D>,
    protection_key: String,
    enabled: bool,
    full_passes: u64,
}

impl<D: DomHost, S: KeyValueStore> CensorPipeline<D, S> {
    /// Build the pipeline. Fails only on invalid configuration.
    pub fn new(dom: D, store: S, config: CensorConfig) -> Result<Self, CensorError> {
        Ok(Self {
            rewriter: Rewriter::from_config(&config)?,
            locator: TextLocator::from_config(&config),
            sink: StoreSink::new(store, &config),
            watcher: ChangeWatcher::new(),
            protection_key: config.protection_key,
            enabled: true,
            full_passes: 0,
            dom,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn watch_state(&self) -> WatchState {
        self.watcher.state()
    }

    /// Live insertion subscription, if observing
    pub fn subscription(&self) -> Option<&D::Subscription> {
        self.watcher.subscription()
    }

    /// Full-document passes run so far
    pub fn full_passes(&self) -> u64 {
        self.full_passes
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn store(&self) -> &S {
        self.sink.store()
    }

    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    pub fn metrics(&self) -> Result<Metrics, CensorError> {
        self.sink.load()
    }

    pub fn summary(&self) -> Result<MetricsSummary, CensorError> {
        Ok(self.sink.load()?.summary())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Read the stored toggle and bring the page in line with it
    pub fn activate(&mut self) {
        self.enabled = match self.sink.store().get(&self.protection_key) {
            Ok(value) => protection_from_value(value.as_ref()),
            Err(e) => {
                warn!(error = %e, "[CensorPipeline] could not read toggle, assuming enabled");
                true
            }
        };
        info!(enabled = self.enabled, "[CensorPipeline] protection state loaded");
        self.apply_protection();
    }

    /// React to a store change notification; other keys are ignored
    pub fn handle_storage_change(&mut self, change: &StorageChange) {
        if change.key != self.protection_key {
            return;
        }
        self.enabled = protection_from_value(change.new_value.as_ref());
        self.apply_protection();
    }

    /// Persist a toggle change and apply it. The new state takes effect even
    /// when persisting fails; the write error is returned.
    pub fn set_protection(&mut self, enabled: bool) -> Result<(), CensorError> {
        info!(enabled, "[CensorPipeline] toggling protection");
        let written = self
            .sink
            .store_mut()
            .set(&self.protection_key, Value::Bool(enabled));
        self.enabled = enabled;
        self.apply_protection();
        written.map_err(CensorError::from)
    }

    /// Stop observing without touching the toggle
    pub fn stop(&mut self) {
        self.watcher.stop(&mut self.dom);
    }

    fn apply_protection(&mut self) {
        if self.enabled {
            info!("[CensorPipeline] protection enabled, processing page");
            self.process_page();
            if let Err(e) = self.watcher.start(&mut self.dom) {
                error!(error = %e, "[CensorPipeline] could not start observer");
            }
        } else {
            info!("[CensorPipeline] protection disabled, skipping page processing");
            self.watcher.stop(&mut self.dom);
        }
    }

    // -------------------------------------------------------------------------
    // Rewriting
    // -------------------------------------------------------------------------

    /// One full pass over the document body. Records a page load even when
    /// nothing was replaced.
    pub fn process_page(&mut self) -> OccurrenceMap {
        if !self.enabled {
            info!("[CensorPipeline] protection disabled, skipping page processing");
            return OccurrenceMap::new();
        }
        let started = Instant::now();

        if let Err(e) = self.sink.ensure_initialized() {
            error!(error = %e, "[CensorPipeline] could not initialise metrics");
        }
        let Some(body) = self.dom.body() else {
            warn!("[CensorPipeline] document has no body");
            return OccurrenceMap::new();
        };

        let segments: Vec<_> = self.locator.locate(&self.dom, &body).collect();
        let occurrences = self.rewriter.rewrite_all(&mut self.dom, &segments);
        self.full_passes += 1;
        info!(
            segments = segments.len(),
            replaced = occurrences.total(),
            "[CensorPipeline] page processed"
        );

        self.record(&occurrences, PassKind::PageLoad, started);
        occurrences
    }

    /// Handle one mutation batch. The sink is called at most once, and only
    /// when something was replaced.
    pub fn handle_mutations(&mut self, records: &[MutationRecord<D::Node>]) -> OccurrenceMap {
        let started = Instant::now();
        let occurrences = self.watcher.handle_batch(
            &mut self.dom,
            &self.locator,
            &mut self.rewriter,
            self.enabled,
            records,
        );
        if !occurrences.is_empty() {
            self.record(&occurrences, PassKind::Mutation, started);
        }
        occurrences
    }

    fn record(&mut self, occurrences: &OccurrenceMap, pass: PassKind, started: Instant) {
        let context = RecordContext {
            url: self.dom.location(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            pass,
        };
        if let Err(e) = self.sink.record(occurrences, &context) {
            error!(error = %e, "[CensorPipeline] error updating metrics");
        }
    }
}
