//! DOM host abstraction
//!
//! The rewriting engine never touches a concrete DOM. Everything it needs
//! (traversal, class/tag inspection, node replacement, stylesheet injection
//! and insertion observation) goes through [`DomHost`].
//!
//! - `arena.rs` - ArenaDom: in-memory tree with mutation records (native + tests)
//! - `web` (crate root, wasm32 only) - WebDom over the live browser DOM

pub mod arena;

pub use arena::*;

use std::fmt::Debug;
use thiserror::Error;

use crate::censor::fragment::Fragment;

// =============================================================================
// Types
// =============================================================================

/// Coarse node classification used by the locator and the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Comments, documents, processing instructions...
    Other,
}

/// A childList mutation delivered by the host: the nodes inserted by one
/// DOM operation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord<N> {
    pub added: Vec<N>,
}

impl<N> MutationRecord<N> {
    pub fn new(added: Vec<N>) -> Self {
        Self { added }
    }
}

/// Class names stamped on generated markup
#[derive(Debug, Clone, Copy)]
pub struct MarkupClasses<'a> {
    /// Carried by every generated container
    pub container: &'a str,
    /// Carried by each censored word
    pub censored: &'a str,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    #[error("node has no parent")]
    Detached,
    #[error("document has no {0}")]
    Missing(&'static str),
    #[error("host rejected operation: {0}")]
    Host(String),
}

// =============================================================================
// DomHost
// =============================================================================

/// The tree operations the engine relies on.
///
/// Tag names are reported lower-cased. Read operations take `&self`;
/// anything that changes the tree takes `&mut self`.
pub trait DomHost {
    type Node: Clone + PartialEq + Debug;
    type Subscription;

    /// The document body, the root of full passes and observation
    fn body(&self) -> Option<Self::Node>;

    fn node_kind(&self, node: &Self::Node) -> NodeKind;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Children in document order
    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Lower-cased tag name; `None` for non-elements
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Character data of a text node
    fn text(&self, node: &Self::Node) -> Option<String>;

    /// True while the node is attached to the document
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Replace a text node with a container built from `fragment`.
    /// Returns the inserted container.
    fn replace_text(
        &mut self,
        text: &Self::Node,
        fragment: &Fragment,
        classes: MarkupClasses<'_>,
    ) -> Result<Self::Node, DomError>;

    fn has_element_with_id(&self, id: &str) -> bool;

    /// Append a `<style id=...>` element to the document head
    fn append_style(&mut self, id: &str, css: &str) -> Result<(), DomError>;

    /// URL of the page hosting the document
    fn location(&self) -> String;

    /// Subscribe to childList insertions anywhere under `root`
    fn observe_insertions(&mut self, root: &Self::Node) -> Result<Self::Subscription, DomError>;

    fn disconnect(&mut self, subscription: Self::Subscription);
}
