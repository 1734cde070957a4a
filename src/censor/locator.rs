//! TextLocator: lazy discovery of eligible text segments
//!
//! Walks a subtree in document order with an explicit work-list and yields
//! one [`TextSegment`] per eligible text node. Every `locate` call starts a
//! fresh traversal.
//!
//! A text node is eligible when:
//! 1. no enclosing element is in the exclusion set (excluded elements prune
//!    their whole subtree),
//! 2. its trimmed content is non-empty,
//! 3. it is not inside a container generated by the rewriter.

use crate::dom::{DomHost, NodeKind};

use super::config::CensorConfig;
use super::patterns::ExclusionSet;

/// One text node handed to the rewriter, plus its containing element
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment<N> {
    pub node: N,
    pub parent: N,
}

#[derive(Debug, Clone)]
pub struct TextLocator {
    exclusions: ExclusionSet,
    processed_class: String,
}

impl TextLocator {
    pub fn new(exclusions: ExclusionSet, processed_class: &str) -> Self {
        Self {
            exclusions,
            processed_class: processed_class.to_string(),
        }
    }

    pub fn from_config(config: &CensorConfig) -> Self {
        Self::new(
            ExclusionSet::new(&config.skip_elements),
            &config.processed_class,
        )
    }

    /// Eligible text segments under `root`, in document order.
    ///
    /// Yields nothing when `root` sits beneath an excluded or generated
    /// element. Collect before rewriting: replacing nodes mid-walk would
    /// invalidate the work-list.
    pub fn locate<'a, D: DomHost>(&'a self, dom: &'a D, root: &D::Node) -> Segments<'a, D> {
        let stack = if self.ancestors_allow(dom, root) {
            vec![root.clone()]
        } else {
            Vec::new()
        };
        Segments {
            locator: self,
            dom,
            stack,
        }
    }

    /// Check a single text node against the exclusion and blank-text rules.
    /// Every enclosing element is checked, so a node reached directly gets
    /// the same answer as one reached by `locate`.
    pub fn candidate<D: DomHost>(&self, dom: &D, node: &D::Node) -> Option<TextSegment<D::Node>> {
        let parent = dom.parent_element(node)?;
        if self.under_excluded(dom, node) {
            return None;
        }
        let text = dom.text(node)?;
        if text.trim().is_empty() {
            return None;
        }
        Some(TextSegment {
            node: node.clone(),
            parent,
        })
    }

    /// Element tag in the exclusion set?
    pub fn is_excluded<D: DomHost>(&self, dom: &D, element: &D::Node) -> bool {
        dom.tag_name(element)
            .map(|tag| self.exclusions.contains(&tag))
            .unwrap_or(false)
    }

    /// Does any enclosing element of `node` carry an excluded tag?
    pub fn under_excluded<D: DomHost>(&self, dom: &D, node: &D::Node) -> bool {
        let mut cur = dom.parent_element(node);
        while let Some(el) = cur {
            if self.is_excluded(dom, &el) {
                return true;
            }
            cur = dom.parent_element(&el);
        }
        false
    }

    /// Element generated by the rewriter?
    pub fn is_marked<D: DomHost>(&self, dom: &D, element: &D::Node) -> bool {
        dom.has_class(element, &self.processed_class)
    }

    /// Is `node` (or any ancestor) a generated container?
    pub fn inside_generated<D: DomHost>(&self, dom: &D, node: &D::Node) -> bool {
        if dom.node_kind(node) == NodeKind::Element && self.is_marked(dom, node) {
            return true;
        }
        let mut cur = dom.parent_element(node);
        while let Some(el) = cur {
            if self.is_marked(dom, &el) {
                return true;
            }
            cur = dom.parent_element(&el);
        }
        false
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    fn ancestors_allow<D: DomHost>(&self, dom: &D, root: &D::Node) -> bool {
        let mut cur = dom.parent_element(root);
        while let Some(el) = cur {
            if self.is_excluded(dom, &el) || self.is_marked(dom, &el) {
                return false;
            }
            cur = dom.parent_element(&el);
        }
        true
    }
}

// =============================================================================
// Segments
// =============================================================================

/// Lazy pre-order walk returned by [`TextLocator::locate`]
pub struct Segments<'a, D: DomHost> {
    locator: &'a TextLocator,
    dom: &'a D,
    stack: Vec<D::Node>,
}

impl<'a, D: DomHost> Iterator for Segments<'a, D> {
    type Item = TextSegment<D::Node>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match self.dom.node_kind(&node) {
                NodeKind::Element => {
                    if self.locator.is_excluded(self.dom, &node)
                        || self.locator.is_marked(self.dom, &node)
                    {
                        continue;
                    }
                    let children = self.dom.child_nodes(&node);
                    self.stack.extend(children.into_iter().rev());
                }
                NodeKind::Text => {
                    if let Some(segment) = self.locator.candidate(self.dom, &node) {
                        return Some(segment);
                    }
                }
                NodeKind::Other => {}
            }
        }
        None
    }
}

// =============================================================================
// Tests
// =============================================================================
