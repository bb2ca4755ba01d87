//! DOM collaborator contract.
//!
//! The engine never owns the live document. It drives an opaque, mutable tree
//! through the [`Dom`] trait, which a host implements over its real document
//! (a browser binding, a native widget tree, a test double).
//!
//! Every method takes `&self`: implementations are expected to use interior
//! mutability, so the same `Rc<dyn Dom>` can be threaded through every view
//! model and captured by event listeners.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_dom::dom::{Dom, MemoryDom};
//!
//! let dom = Rc::new(MemoryDom::new());
//! let div = dom.create_element("div");
//! dom.set_attribute(div, "id", "app");
//! dom.append_child(dom.body(), div);
//! ```

mod memory;

pub use memory::*;

use std::rc::Rc;

use serde::Serialize;

// =============================================================================
// Handles
// =============================================================================

/// Handle to a live DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Handle returned by [`Dom::add_listener`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub usize);

/// Kind of a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

// =============================================================================
// Events
// =============================================================================

/// A native event travelling from its target up through its ancestors.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event type (`"click"`, `"input"`, `"keyup"`).
    pub event_type: String,
    /// Node the event was fired on.
    pub target: NodeId,
    /// Key name for keyboard events (`"Enter"`, `"PageDown"`).
    pub key: Option<String>,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            key: None,
            propagation_stopped: false,
        }
    }

    /// Builder: attach a key name.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Halt propagation to further ancestors.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Native event listener.
pub type Listener = Rc<dyn Fn(&mut Event)>;

// =============================================================================
// Dom trait
// =============================================================================

/// The live document, as seen by the engine.
///
/// Child-insertion methods have DOM move semantics: inserting a node that
/// already has a parent detaches it from that parent first.
pub trait Dom {
    /// Create a detached element.
    fn create_element(&self, tag: &str) -> NodeId;

    /// Create a detached text node.
    fn create_text(&self, text: &str) -> NodeId;

    /// Node kind, or `None` for an unknown handle.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name of an element.
    fn tag(&self, node: NodeId) -> Option<String>;

    /// Content of a text node.
    fn text(&self, node: NodeId) -> Option<String>;

    /// All attributes of an element, in document order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&self, node: NodeId, name: &str);

    /// Replace the content of a text node.
    fn set_text(&self, node: NodeId, text: &str);

    /// Current value of a form control (falls back to its `value` attribute).
    fn value(&self, node: NodeId) -> Option<String>;

    fn append_child(&self, parent: NodeId, child: NodeId);

    fn insert_before(&self, parent: NodeId, child: NodeId, reference: NodeId);

    /// Put `new` where `old` is under `parent`, detaching `old`.
    fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId);

    fn remove_child(&self, parent: NodeId, child: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Attach a bubbling listener for `event_type` on `node`.
    fn add_listener(&self, node: NodeId, event_type: &str, listener: Listener) -> ListenerId;

    fn remove_listener(&self, node: NodeId, id: ListenerId);

    /// Find the first element matching `#id`, `.class` or a tag name.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;
}
