//! ArenaDom: in-memory document tree
//!
//! Arena-allocated nodes addressed by compact `NodeId`s, tag names interned
//! with `lasso`. Implements [`DomHost`] so the engine runs natively, and
//! queues childList mutation records per observer the way a browser
//! `MutationObserver` would, to be drained with [`ArenaDom::take_records`].

use lasso::{Rodeo, Spur};

use super::{DomError, DomHost, MarkupClasses, MutationRecord, NodeKind};
use crate::censor::fragment::{Fragment, Piece};

// =============================================================================
// Types
// =============================================================================

/// Node identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle returned by `observe_insertions`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element {
        tag: Spur,
        id: Option<String>,
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct ArenaNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Observer {
    id: ObserverId,
    root: NodeId,
    pending: Vec<MutationRecord<NodeId>>,
}

// =============================================================================
// ArenaDom
// =============================================================================

/// `document > html > (head, body)` plus whatever the caller builds
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
    tags: Rodeo,
    document: NodeId,
    head: NodeId,
    body: NodeId,
    url: String,
    observers: Vec<Observer>,
    next_observer: u64,
    /// childList operations performed on connected nodes
    mutation_count: u64,
}

impl std::fmt::Debug for ArenaDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaDom")
            .field("nodes", &self.nodes.len())
            .field("url", &self.url)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaDom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            tags: Rodeo::default(),
            document: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            url: "about:blank".to_string(),
            observers: Vec::new(),
            next_observer: 0,
            mutation_count: 0,
        };

        dom.document = dom.alloc(NodeData::Document);
        let html = dom.create_element("html");
        dom.attach(dom.document, html);
        dom.head = dom.create_element("head");
        dom.attach(html, dom.head);
        dom.body = dom.create_element("body");
        dom.attach(html, dom.body);
        dom.mutation_count = 0;
        dom
    }

    /// Set the URL reported by `location()`
    pub fn with_location(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body_id(&self) -> NodeId {
        self.body
    }

    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = self.tags.get_or_intern(tag.to_ascii_lowercase());
        self.alloc(NodeData::Element {
            tag,
            id: None,
            classes: Vec::new(),
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    /// Append `child` to `parent`, moving it if already attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if matches!(self.node(parent).data, NodeData::Text(_) | NodeData::Comment(_)) {
            return Err(DomError::Host("character data cannot have children".into()));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomError::Host("hierarchy request error".into()));
        }
        self.detach(child);
        self.attach(parent, child);
        self.notify_insertion(parent, vec![child]);
        Ok(())
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let el = self.create_element(tag);
        self.attach(parent, el);
        self.notify_insertion(parent, vec![el]);
        el
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.attach(parent, node);
        self.notify_insertion(parent, vec![node]);
        node
    }

    /// Detach `node` from its parent
    pub fn remove(&mut self, node: NodeId) {
        if self.node(node).parent.is_some() {
            if self.is_connected_id(node) {
                self.mutation_count += 1;
            }
            self.detach(node);
        }
    }

    pub fn add_class(&mut self, element: NodeId, class: &str) {
        if let NodeData::Element { classes, .. } = &mut self.node_mut(element).data {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    pub fn set_id(&mut self, element: NodeId, value: &str) {
        if let NodeData::Element { id, .. } = &mut self.node_mut(element).data {
            *id = Some(value.to_string());
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.document).into_iter().find(|n| {
            matches!(&self.node(*n).data, NodeData::Element { id: Some(v), .. } if v == id)
        })
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        match &self.node(node).data {
            NodeData::Text(s) => s.clone(),
            NodeData::Comment(_) => String::new(),
            _ => self
                .node(node)
                .children
                .iter()
                .map(|c| self.text_content(*c))
                .collect(),
        }
    }

    /// Serialize children of `node` as HTML
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in &self.node(node).children {
            self.write_html(*child, &mut out);
        }
        out
    }

    /// Drain the records queued for an observer
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord<NodeId>> {
        self.observers
            .iter_mut()
            .find(|o| o.id == observer)
            .map(|o| std::mem::take(&mut o.pending))
            .unwrap_or_default()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ArenaNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> &ArenaNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ArenaNode {
        &mut self.nodes[id.index()]
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != child);
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.node(node).parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.node(p).parent;
        }
        false
    }

    fn is_connected_id(&self, node: NodeId) -> bool {
        node == self.document || self.is_ancestor(self.document, node)
    }

    fn notify_insertion(&mut self, parent: NodeId, added: Vec<NodeId>) {
        if !self.is_connected_id(parent) {
            return;
        }
        self.mutation_count += 1;

        let under: Vec<bool> = self
            .observers
            .iter()
            .map(|o| o.root == parent || self.is_ancestor(o.root, parent))
            .collect();
        for (observer, hit) in self.observers.iter_mut().zip(under) {
            if hit {
                observer.pending.push(MutationRecord::new(added.clone()));
            }
        }
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.node(n).children.iter().rev());
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.node(node).data {
            NodeData::Text(s) => out.push_str(s),
            NodeData::Comment(s) => {
                out.push_str("<!--");
                out.push_str(s);
                out.push_str("-->");
            }
            NodeData::Document => out.push_str(&self.inner_html(node)),
            NodeData::Element { tag, id, classes } => {
                let tag = self.tags.resolve(tag);
                out.push('<');
                out.push_str(tag);
                if let Some(id) = id {
                    out.push_str(&format!(" id=\"{}\"", id));
                }
                if !classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", classes.join(" ")));
                }
                out.push('>');
                out.push_str(&self.inner_html(node));
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
}

// =============================================================================
// DomHost
// =============================================================================

impl DomHost for ArenaDom {
    type Node = NodeId;
    type Subscription = ObserverId;

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn node_kind(&self, node: &NodeId) -> NodeKind {
        match self.node(*node).data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Document | NodeData::Comment(_) => NodeKind::Other,
        }
    }

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node)
            .parent
            .filter(|p| matches!(self.node(*p).data, NodeData::Element { .. }))
    }

    fn child_nodes(&self, node: &NodeId) -> Vec<NodeId> {
        self.node(*node).children.clone()
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        match &self.node(*node).data {
            NodeData::Element { tag, .. } => Some(self.tags.resolve(tag).to_string()),
            _ => None,
        }
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        match &self.node(*node).data {
            NodeData::Element { classes, .. } => classes.iter().any(|c| c == class),
            _ => false,
        }
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.node(*node).data {
            NodeData::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.is_connected_id(*node)
    }

    fn replace_text(
        &mut self,
        text: &NodeId,
        fragment: &Fragment,
        classes: MarkupClasses<'_>,
    ) -> Result<NodeId, DomError> {
        if self.node_kind(text) != NodeKind::Text {
            return Err(DomError::Host("not a text node".into()));
        }
        let parent = self.node(*text).parent.ok_or(DomError::Detached)?;

        let container = self.create_element("span");
        self.add_class(container, classes.container);
        for piece in fragment.pieces() {
            let child = match piece {
                Piece::Text(s) => self.create_text(s),
                Piece::Censored(s) => {
                    let span = self.create_element("span");
                    self.add_class(span, classes.censored);
                    let inner = self.create_text(s);
                    self.attach(span, inner);
                    span
                }
            };
            self.attach(container, child);
        }

        let slot = self
            .node(parent)
            .children
            .iter()
            .position(|c| c == text)
            .ok_or(DomError::Detached)?;
        self.node_mut(parent).children[slot] = container;
        self.node_mut(container).parent = Some(parent);
        self.node_mut(*text).parent = None;
        self.notify_insertion(parent, vec![container]);

        Ok(container)
    }

    fn has_element_with_id(&self, id: &str) -> bool {
        self.element_by_id(id).is_some()
    }

    fn append_style(&mut self, id: &str, css: &str) -> Result<(), DomError> {
        let style = self.create_element("style");
        self.set_id(style, id);
        let text = self.create_text(css);
        self.attach(style, text);
        let head = self.head;
        self.append_child(head, style)
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn observe_insertions(&mut self, root: &NodeId) -> Result<ObserverId, DomError> {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(Observer {
            id,
            root: *root,
            pending: Vec::new(),
        });
        Ok(id)
    }

    fn disconnect(&mut self, subscription: ObserverId) {
        self.observers.retain(|o| o.id != subscription);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_body_and_head() {
        let dom = ArenaDom::new();
        assert_eq!(dom.tag_name(&dom.body_id()).as_deref(), Some("body"));
        assert_eq!(dom.tag_name(&dom.head()).as_deref(), Some("head"));
        assert!(dom.is_connected(&dom.body_id()));
        assert_eq!(dom.mutation_count(), 0);
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        let mut dom = ArenaDom::new();
        let el = dom.create_element("SCRIPT");
        assert_eq!(dom.tag_name(&el).as_deref(), Some("script"));
    }

    #[test]
    fn test_detached_nodes_are_not_connected() {
        let mut dom = ArenaDom::new();
        let div = dom.create_element("div");
        let text = dom.create_text("hello");
        dom.append_child(div, text).unwrap();

        assert!(!dom.is_connected(&text));
        dom.append_child(dom.body_id(), div).unwrap();
        assert!(dom.is_connected(&text));

        dom.remove(div);
        assert!(!dom.is_connected(&text));
    }

    #[test]
    fn test_observer_sees_only_insertions_under_root() {
        let mut dom = ArenaDom::new();
        let body = dom.body_id();
        let sub = dom.observe_insertions(&body).unwrap();

        let p = dom.append_element(body, "p");
        let t = dom.append_text(p, "hi");
        let head = dom.head();
        dom.append_element(head, "meta");

        let records = dom.take_records(sub);
        assert_eq!(records, vec![MutationRecord::new(vec![p]), MutationRecord::new(vec![t])]);
        assert!(dom.take_records(sub).is_empty());
    }

    #[test]
    fn test_insertions_into_detached_subtree_are_not_recorded() {
        let mut dom = ArenaDom::new();
        let body = dom.body_id();
        let sub = dom.observe_insertions(&body).unwrap();

        let div = dom.create_element("div");
        dom.append_text(div, "one");
        dom.append_text(div, "two");
        dom.append_child(body, div).unwrap();

        assert_eq!(dom.take_records(sub), vec![MutationRecord::new(vec![div])]);
    }

    #[test]
    fn test_disconnect_stops_recording() {
        let mut dom = ArenaDom::new();
        let body = dom.body_id();
        let sub = dom.observe_insertions(&body).unwrap();
        dom.disconnect(sub);
        dom.append_text(body, "late");
        assert_eq!(dom.observer_count(), 0);
        assert!(dom.take_records(sub).is_empty());
    }

    #[test]
    fn test_replace_text_builds_marked_container() {
        let mut dom = ArenaDom::new();
        let body = dom.body_id();
        let p = dom.append_element(body, "p");
        let t = dom.append_text(p, "my job");

        let fragment = Fragment::from_pieces(vec![
            Piece::Text("my ".into()),
            Piece::Censored("j*b".into()),
        ]);
        let classes = MarkupClasses {
            container: "processed",
            censored: "anim",
        };
        let container = dom.replace_text(&t, &fragment, classes).unwrap();

        assert!(dom.has_class(&container, "processed"));
        assert!(!dom.is_connected(&t));
        assert_eq!(
            dom.inner_html(p),
            "<span class=\"processed\">my <span class=\"anim\">j*b</span></span>"
        );
    }

    #[test]
    fn test_replace_detached_text_fails() {
        let mut dom = ArenaDom::new();
        let t = dom.create_text("job");
        let classes = MarkupClasses {
            container: "a",
            censored: "b",
        };
        let result = dom.replace_text(&t, &Fragment::plain("job"), classes);
        assert_eq!(result, Err(DomError::Detached));
    }

    #[test]
    fn test_append_style_is_findable_by_id() {
        let mut dom = ArenaDom::new();
        assert!(!dom.has_element_with_id("sheet"));
        dom.append_style("sheet", ".x {}").unwrap();
        assert!(dom.has_element_with_id("sheet"));
        assert_eq!(dom.text_content(dom.head()), ".x {}");
    }

    #[test]
    fn test_cyclic_append_is_rejected() {
        let mut dom = ArenaDom::new();
        let body = dom.body_id();
        let outer = dom.append_element(body, "div");
        let inner = dom.append_element(outer, "div");
        assert!(dom.append_child(inner, outer).is_err());
    }
}
