//! Rewriter: apply the pattern table to one segment and swap it in the tree
//!
//! The original text node is replaced by a container carrying the processed
//! marker, so later scans and the mutation watcher recognise it and skip it.
//! The presentation stylesheet is installed on the first invocation.

use tracing::{debug, warn};

use crate::dom::{DomHost, MarkupClasses};

use super::config::CensorConfig;
use super::error::CensorError;
use super::locator::TextSegment;
use super::occurrences::OccurrenceMap;
use super::patterns::PatternTable;

#[derive(Debug, Clone)]
pub struct Rewriter {
    table: PatternTable,
    processed_class: String,
    censored_class: String,
    style_id: String,
    style_css: String,
    style_ready: bool,
}

impl Rewriter {
    pub fn from_config(config: &CensorConfig) -> Result<Self, CensorError> {
        Ok(Self {
            table: PatternTable::from_config(config)?,
            processed_class: config.processed_class.clone(),
            censored_class: config.censored_class.clone(),
            style_id: config.style_id.clone(),
            style_css: config.style_css.clone(),
            style_ready: false,
        })
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Insert the stylesheet unless an element with its id already exists.
    /// Checked once per rewriter; a failed insert is retried next call.
    pub fn ensure_stylesheet<D: DomHost>(&mut self, dom: &mut D) {
        if self.style_ready {
            return;
        }
        if !dom.has_element_with_id(&self.style_id) {
            if let Err(e) = dom.append_style(&self.style_id, &self.style_css) {
                warn!(error = %e, "[Rewriter] could not install stylesheet");
                return;
            }
            debug!(id = %self.style_id, "[Rewriter] stylesheet installed");
        }
        self.style_ready = true;
    }

    /// Rewrite one segment in place. Returns what was replaced; an empty map
    /// means the tree was not touched.
    pub fn rewrite<D: DomHost>(
        &mut self,
        dom: &mut D,
        segment: &TextSegment<D::Node>,
    ) -> OccurrenceMap {
        self.ensure_stylesheet(dom);

        // The tree may have moved on since the segment was located
        if !dom.is_connected(&segment.node) {
            debug!("[Rewriter] segment detached, skipping");
            return OccurrenceMap::new();
        }
        if dom.parent_element(&segment.node).is_none()
            || self.under_excluded(dom, &segment.node)
        {
            return OccurrenceMap::new();
        }
        let Some(text) = dom.text(&segment.node) else {
            return OccurrenceMap::new();
        };

        let rewrite = self.table.apply(&text);
        if rewrite.is_unchanged() {
            return OccurrenceMap::new();
        }

        let classes = MarkupClasses {
            container: &self.processed_class,
            censored: &self.censored_class,
        };
        match dom.replace_text(&segment.node, &rewrite.fragment, classes) {
            Ok(_) => rewrite.occurrences,
            Err(e) => {
                warn!(error = %e, "[Rewriter] replacement failed, leaving text as is");
                OccurrenceMap::new()
            }
        }
    }

    fn under_excluded<D: DomHost>(&self, dom: &D, node: &D::Node) -> bool {
        let mut cur = dom.parent_element(node);
        while let Some(el) = cur {
            if dom
                .tag_name(&el)
                .is_some_and(|tag| self.table.is_excluded(&tag))
            {
                return true;
            }
            cur = dom.parent_element(&el);
        }
        false
    }

    /// Rewrite a batch of collected segments and merge their tallies
    pub fn rewrite_all<D: DomHost>(
        &mut self,
        dom: &mut D,
        segments: &[TextSegment<D::Node>],
    ) -> OccurrenceMap {
        let mut merged = OccurrenceMap::new();
        for segment in segments {
            merged.merge(&self.rewrite(dom, segment));
        }
        merged
    }
}

// =============================================================================
// Tests
// =============================================================================
