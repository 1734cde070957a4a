//! WebDom: the live browser document

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, MutationObserver, MutationObserverInit, Node, NodeList, Window};

use crate::censor::fragment::{Fragment, Piece};
use crate::dom::{DomError, DomHost, MarkupClasses, MutationRecord, NodeKind};

use super::describe;

type BatchHandler = Box<dyn FnMut(Vec<MutationRecord<Node>>)>;

/// Where observer callbacks deliver their batches. Filled in once the
/// owning pipeline exists.
#[derive(Clone, Default)]
pub struct BatchSlot(Rc<RefCell<Option<BatchHandler>>>);

impl BatchSlot {
    pub fn set_handler<F>(&self, handler: F)
    where
        F: FnMut(Vec<MutationRecord<Node>>) + 'static,
    {
        *self.0.borrow_mut() = Some(Box::new(handler));
    }

    fn deliver(&self, records: Vec<MutationRecord<Node>>) {
        match self.0.try_borrow_mut() {
            Ok(mut slot) => match slot.as_mut() {
                Some(handler) => handler(records),
                None => debug!("[WebDom] batch dropped, no handler"),
            },
            Err(_) => warn!("[WebDom] batch dropped, handler busy"),
        }
    }
}

/// A live `MutationObserver` plus the closure it calls
pub struct WebSubscription {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

pub struct WebDom {
    window: Window,
    document: Document,
    batches: BatchSlot,
}

fn host_error(value: JsValue) -> DomError {
    DomError::Host(describe(&value))
}

fn node_list(list: &NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

impl WebDom {
    pub fn from_window() -> Result<Self, DomError> {
        let window = web_sys::window().ok_or(DomError::Missing("window"))?;
        let document = window.document().ok_or(DomError::Missing("document"))?;
        Ok(Self {
            window,
            document,
            batches: BatchSlot::default(),
        })
    }

    pub fn batch_slot(&self) -> BatchSlot {
        self.batches.clone()
    }

    fn span(&self, class: &str) -> Result<Element, DomError> {
        let span = self.document.create_element("span").map_err(host_error)?;
        span.set_class_name(class);
        Ok(span)
    }
}

impl DomHost for WebDom {
    type Node = Node;
    type Subscription = WebSubscription;

    fn body(&self) -> Option<Node> {
        self.document.body().map(Node::from)
    }

    fn node_kind(&self, node: &Node) -> NodeKind {
        match node.node_type() {
            Node::ELEMENT_NODE => NodeKind::Element,
            Node::TEXT_NODE => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn parent_element(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Node::from)
    }

    fn child_nodes(&self, node: &Node) -> Vec<Node> {
        node_list(&node.child_nodes())
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>()
            .map(|el| el.tag_name().to_ascii_lowercase())
    }

    fn has_class(&self, node: &Node, class: &str) -> bool {
        node.dyn_ref::<Element>()
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() == Node::TEXT_NODE {
            node.node_value()
        } else {
            None
        }
    }

    fn is_connected(&self, node: &Node) -> bool {
        node.is_connected()
    }

    fn replace_text(
        &mut self,
        text: &Node,
        fragment: &Fragment,
        classes: MarkupClasses<'_>,
    ) -> Result<Node, DomError> {
        let parent = text.parent_node().ok_or(DomError::Detached)?;

        let container = self.span(classes.container)?;
        for piece in fragment.pieces() {
            match piece {
                Piece::Text(s) => {
                    let node = self.document.create_text_node(s);
                    container.append_child(&node).map_err(host_error)?;
                }
                Piece::Censored(s) => {
                    let word = self.span(classes.censored)?;
                    word.set_text_content(Some(s));
                    container.append_child(&word).map_err(host_error)?;
                }
            }
        }

        parent.replace_child(&container, text).map_err(host_error)?;
        Ok(container.into())
    }

    fn has_element_with_id(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn append_style(&mut self, id: &str, css: &str) -> Result<(), DomError> {
        let head = self.document.head().ok_or(DomError::Missing("head"))?;
        let style = self.document.create_element("style").map_err(host_error)?;
        style.set_id(id);
        style.set_text_content(Some(css));
        head.append_child(&style).map_err(host_error)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn observe_insertions(&mut self, root: &Node) -> Result<WebSubscription, DomError> {
        let slot = self.batches.clone();
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |entries: js_sys::Array, _observer: MutationObserver| {
                let records: Vec<MutationRecord<Node>> = entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<web_sys::MutationRecord>().ok())
                    .map(|record| MutationRecord::new(node_list(&record.added_nodes())))
                    .filter(|record| !record.added.is_empty())
                    .collect();
                if !records.is_empty() {
                    slot.deliver(records);
                }
            },
        );

        let observer =
            MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(host_error)?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        observer
            .observe_with_options(root, &options)
            .map_err(host_error)?;

        Ok(WebSubscription {
            observer,
            _callback: callback,
        })
    }

    fn disconnect(&mut self, subscription: WebSubscription) {
        subscription.observer.disconnect();
    }
}
