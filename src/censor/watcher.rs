//! ChangeWatcher: incremental rewriting driven by DOM insertions
//!
//! # State machine
//! `Stopped -> Observing -> Stopped`. Starting while already observing drops
//! the previous subscription first, so there is never more than one.
//!
//! Every container the rewriter inserts is itself reported as an insertion.
//! Those come back in a later batch carrying the processed marker and are
//! skipped, which is what keeps the watcher from feeding on its own output.

use tracing::{debug, info};

use crate::dom::{DomError, DomHost, MutationRecord, NodeKind};

use super::error::CensorError;
use super::locator::TextLocator;
use super::occurrences::OccurrenceMap;
use super::rewriter::Rewriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Stopped,
    Observing,
}

impl WatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchState::Stopped => "stopped",
            WatchState::Observing => "observing",
        }
    }
}

pub struct ChangeWatcher<D: DomHost> {
    subscription: Option<D::Subscription>,
}

impl<D: DomHost> Default for ChangeWatcher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DomHost> ChangeWatcher<D> {
    pub fn new() -> Self {
        Self {
            subscription: None,
        }
    }

    pub fn state(&self) -> WatchState {
        if self.subscription.is_some() {
            WatchState::Observing
        } else {
            WatchState::Stopped
        }
    }

    pub fn is_observing(&self) -> bool {
        self.state() == WatchState::Observing
    }

    pub fn subscription(&self) -> Option<&D::Subscription> {
        self.subscription.as_ref()
    }

    /// Subscribe to insertions under the document body
    pub fn start(&mut self, dom: &mut D) -> Result<(), CensorError> {
        self.stop(dom);
        let body = dom.body().ok_or(DomError::Missing("body"))?;
        self.subscription = Some(dom.observe_insertions(&body)?);
        info!("[ChangeWatcher] observer started");
        Ok(())
    }

    pub fn stop(&mut self, dom: &mut D) {
        if let Some(subscription) = self.subscription.take() {
            dom.disconnect(subscription);
            info!("[ChangeWatcher] observer stopped");
        }
    }

    /// Handle one delivered batch. Inserted text nodes are rewritten
    /// directly, inserted elements are rescanned as a subtree. Returns the
    /// merged tally for the whole batch.
    pub fn handle_batch(
        &mut self,
        dom: &mut D,
        locator: &TextLocator,
        rewriter: &mut Rewriter,
        enabled: bool,
        records: &[MutationRecord<D::Node>],
    ) -> OccurrenceMap {
        let mut merged = OccurrenceMap::new();
        if !enabled || !self.is_observing() {
            return merged;
        }

        for node in records.iter().flat_map(|r| r.added.iter()) {
            match dom.node_kind(node) {
                NodeKind::Text => {
                    if locator.inside_generated(dom, node) {
                        continue;
                    }
                    if let Some(segment) = locator.candidate(dom, node) {
                        merged.merge(&rewriter.rewrite(dom, &segment));
                    }
                }
                NodeKind::Element => {
                    if locator.is_marked(dom, node) || !dom.is_connected(node) {
                        continue;
                    }
                    let segments: Vec<_> = locator.locate(dom, node).collect();
                    merged.merge(&rewriter.rewrite_all(dom, &segments));
                }
                NodeKind::Other => {}
            }
        }

        if !merged.is_empty() {
            debug!(replaced = merged.total(), "[ChangeWatcher] batch rewritten");
        }
        merged
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::censor::config::CensorConfig;
    use crate::dom::ArenaDom;

    struct Harness {
        dom: ArenaDom,
        locator: TextLocator,
        rewriter: Rewriter,
        watcher: ChangeWatcher<ArenaDom>,
    }

    impl Harness {
        fn new() -> Self {
            let config = CensorConfig::default();
            Self {
                dom: ArenaDom::new(),
                locator: TextLocator::from_config(&config),
                rewriter: Rewriter::from_config(&config).unwrap(),
                watcher: ChangeWatcher::new(),
            }
        }

        fn deliver(&mut self, records: &[MutationRecord<crate::dom::NodeId>]) -> OccurrenceMap {
            self.watcher.handle_batch(
                &mut self.dom,
                &self.locator,
                &mut self.rewriter,
                true,
                records,
            )
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut h = Harness::new();
        assert_eq!(h.watcher.state(), WatchState::Stopped);

        h.watcher.start(&mut h.dom).unwrap();
        assert_eq!(h.watcher.state(), WatchState::Observing);
        assert_eq!(h.dom.observer_count(), 1);

        h.watcher.stop(&mut h.dom);
        assert_eq!(h.watcher.state(), WatchState::Stopped);
        assert_eq!(h.dom.observer_count(), 0);
    }

    #[test]
    fn test_restart_does_not_duplicate_subscription() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        h.watcher.start(&mut h.dom).unwrap();
        assert_eq!(h.dom.observer_count(), 1);
    }

    #[test]
    fn test_stopped_watcher_ignores_batches() {
        let mut h = Harness::new();
        let body = h.dom.body_id();
        let t = h.dom.append_text(body, "job");

        let occ = h.deliver(&[MutationRecord::new(vec![t])]);
        assert!(occ.is_empty());
        assert_eq!(h.dom.text(&t).as_deref(), Some("job"));
    }

    #[test]
    fn test_disabled_flag_ignores_batches() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let body = h.dom.body_id();
        let t = h.dom.append_text(body, "job");

        let occ = h.watcher.handle_batch(
            &mut h.dom,
            &h.locator,
            &mut h.rewriter,
            false,
            &[MutationRecord::new(vec![t])],
        );
        assert!(occ.is_empty());
        assert!(h.dom.is_connected(&t));
    }

    #[test]
    fn test_text_and_subtree_insertions() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let body = h.dom.body_id();

        h.dom.append_text(body, "new job posted ");
        let div = h.dom.create_element("div");
        h.dom.append_text(div, "great salary");
        h.dom.append_child(body, div).unwrap();

        let sub = h.watcher.subscription.unwrap();
        let records = h.dom.take_records(sub);
        assert_eq!(records.len(), 2);

        let occ = h.deliver(&records);
        assert_eq!(occ.get("job"), 1);
        assert_eq!(occ.get("salary"), 1);
        assert_eq!(h.dom.text_content(body), "new j*b posted great s*l*ry");
    }

    #[test]
    fn test_own_insertions_do_not_feed_back() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let sub = h.watcher.subscription.unwrap();
        let body = h.dom.body_id();
        h.dom.append_text(body, "job");

        let first = h.dom.take_records(sub);
        assert_eq!(h.deliver(&first).total(), 1);

        // The container insertion comes back as the next batch
        let second = h.dom.take_records(sub);
        assert_eq!(second.len(), 1);
        let before = h.dom.mutation_count();
        assert!(h.deliver(&second).is_empty());
        assert_eq!(h.dom.mutation_count(), before);
        assert!(h.dom.take_records(sub).is_empty());
    }

    #[test]
    fn test_synthetic_record_inside_excluded_parent() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let body = h.dom.body_id();
        let style = h.dom.append_element(body, "style");
        let t = h.dom.append_text(style, ".job { color: red }");

        let occ = h.deliver(&[MutationRecord::new(vec![t])]);
        assert!(occ.is_empty());
        assert_eq!(h.dom.text_content(style), ".job { color: red }");
    }

    #[test]
    fn test_text_inside_generated_container_is_skipped() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let body = h.dom.body_id();
        let container = h.dom.append_element(body, "span");
        h.dom.add_class(container, crate::censor::config::PROCESSED_CLASS);
        let t = h.dom.append_text(container, "job");

        assert!(h.deliver(&[MutationRecord::new(vec![t])]).is_empty());
    }

    #[test]
    fn test_node_removed_before_delivery_is_skipped() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let body = h.dom.body_id();
        let div = h.dom.append_element(body, "div");
        let t = h.dom.append_text(div, "job");
        h.dom.remove(div);

        let occ = h.deliver(&[MutationRecord::new(vec![div]), MutationRecord::new(vec![t])]);
        assert!(occ.is_empty());
    }

    #[test]
    fn test_element_and_its_child_in_same_batch_counted_once() {
        let mut h = Harness::new();
        h.watcher.start(&mut h.dom).unwrap();
        let body = h.dom.body_id();
        let div = h.dom.append_element(body, "div");
        let t = h.dom.append_text(div, "job");

        let occ = h.deliver(&[MutationRecord::new(vec![div]), MutationRecord::new(vec![t])]);
        assert_eq!(occ.get("job"), 1);
    }
}
