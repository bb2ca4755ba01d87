//! In-memory [`Dom`] implementation.
//!
//! A complete, single-threaded document kept in an arena. Every mutation the
//! engine performs is appended to a log, so tests can assert exactly which
//! live operations a render caused. Events are dispatched with bubbling from
//! the target up to the document body.

use std::cell::RefCell;

use super::{Dom, Event, Listener, ListenerId, NodeId, NodeKind};

// =============================================================================
// Mutation log
// =============================================================================

/// One live operation, as recorded by [`MemoryDom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetText { node: NodeId, text: String },
    Append { parent: NodeId, child: NodeId },
    InsertBefore { parent: NodeId, child: NodeId, reference: NodeId },
    Replace { parent: NodeId, new: NodeId, old: NodeId },
    Remove { parent: NodeId, child: NodeId },
    AddListener { node: NodeId, event_type: String },
    RemoveListener { node: NodeId, event_type: String },
}

impl Mutation {
    /// Listener bookkeeping does not change what the document shows.
    pub fn is_visible(&self) -> bool {
        !matches!(
            self,
            Mutation::AddListener { .. } | Mutation::RemoveListener { .. }
        )
    }
}

// =============================================================================
// Arena
// =============================================================================

enum Data {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

struct MemNode {
    data: Data,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(ListenerId, String, Listener)>,
}

struct Inner {
    nodes: Vec<MemNode>,
    body: NodeId,
    next_listener: usize,
    log: Vec<Mutation>,
}

impl Inner {
    fn push(&mut self, data: Data) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MemNode {
            data,
            value: None,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&MemNode> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemNode> {
        self.nodes.get_mut(id.0)
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, at: Option<usize>) {
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            match at {
                Some(i) if i <= p.children.len() => p.children.insert(i, child),
                _ => p.children.push(child),
            }
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent)?.children.iter().position(|c| *c == child)
    }
}

/// An in-memory document with a `<body>` root.
///
/// Nodes are never freed: a detached node keeps its id and contents so it
/// can be re-attached or inspected later. Memory therefore grows with every
/// node ever created, which suits tests and short-lived hosts; a long-running
/// host should drive a real document through [`Dom`] instead.
///
/// # Example
///
/// ```ignore
/// let dom = MemoryDom::new();
/// let app = dom.element(dom.body(), "div", &[("id", "app")]);
/// dom.take_mutations();
/// ```
pub struct MemoryDom {
    inner: RefCell<Inner>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create a document containing only `<body>`.
    pub fn new() -> Self {
        let mut inner = Inner {
            nodes: Vec::new(),
            body: NodeId(0),
            next_listener: 0,
            log: Vec::new(),
        };
        inner.body = inner.push(Data::Element {
            tag: "body".to_string(),
            attrs: Vec::new(),
        });
        Self {
            inner: RefCell::new(inner),
        }
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    /// Nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn element(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(node, name, value);
        }
        self.append_child(parent, node);
        node
    }

    /// Create a text node and append it to `parent`.
    pub fn text_node(&self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    /// Drain the mutation log.
    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.inner.borrow_mut().log)
    }

    /// Simulate user input into a form control.
    pub fn set_value(&self, node: NodeId, value: &str) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.value = Some(value.to_string());
        }
    }

    /// Number of listeners attached to `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.inner
            .borrow()
            .node(node)
            .map_or(0, |n| n.listeners.len())
    }

    /// Number of listeners attached anywhere in the document.
    pub fn total_listeners(&self) -> usize {
        self.inner
            .borrow()
            .nodes
            .iter()
            .map(|n| n.listeners.len())
            .sum()
    }

    /// Fire `event` at its target and bubble it up to the root.
    ///
    /// Listeners are cloned out of the arena before they run, so they may
    /// freely mutate the document.
    pub fn dispatch(&self, event: &mut Event) {
        let mut path = Vec::new();
        let mut current = Some(event.target);
        {
            let inner = self.inner.borrow();
            while let Some(id) = current {
                path.push(id);
                current = inner.node(id).and_then(|n| n.parent);
            }
        }

        for node in path {
            let listeners: Vec<Listener> = {
                let inner = self.inner.borrow();
                let Some(n) = inner.node(node) else { continue };
                n.listeners
                    .iter()
                    .filter(|(_, ty, _)| *ty == event.event_type)
                    .map(|(_, _, l)| l.clone())
                    .collect()
            };
            for listener in listeners {
                listener(event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
    }

    /// Outer HTML of `node`, attributes in insertion order.
    pub fn html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Concatenated HTML of the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let children = {
            let inner = self.inner.borrow();
            let Some(n) = inner.node(node) else { return };
            match &n.data {
                Data::Text(text) => {
                    out.push_str(text);
                    return;
                }
                Data::Element { tag, attrs } => {
                    out.push('<');
                    out.push_str(tag);
                    for (name, value) in attrs {
                        out.push_str(&format!(" {}=\"{}\"", name, value));
                    }
                    out.push('>');
                }
            }
            n.children.clone()
        };
        for child in children {
            self.write_html(child, out);
        }
        if let Some(tag) = self.tag(node) {
            out.push_str(&format!("</{}>", tag));
        }
    }

    fn log(&self, mutation: Mutation) {
        log::trace!("dom: {:?}", mutation);
        self.inner.borrow_mut().log.push(mutation);
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        let inner = self.inner.borrow();
        let Some(MemNode {
            data: Data::Element { tag, attrs },
            ..
        }) = inner.node(node)
        else {
            return false;
        };
        let attr = |name: &str| attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str());
        if let Some(id) = selector.strip_prefix('#') {
            attr("id") == Some(id)
        } else if let Some(class) = selector.strip_prefix('.') {
            attr("class").is_some_and(|c| c.split_whitespace().any(|c| c == class))
        } else {
            tag.eq_ignore_ascii_case(selector)
        }
    }

    fn find(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        if self.matches(node, selector) {
            return Some(node);
        }
        self.children(node)
            .into_iter()
            .find_map(|child| self.find(child, selector))
    }
}

// =============================================================================
// Dom
// =============================================================================

impl Dom for MemoryDom {
    fn create_element(&self, tag: &str) -> NodeId {
        let tag = tag.to_ascii_lowercase();
        let node = self.inner.borrow_mut().push(Data::Element {
            tag: tag.clone(),
            attrs: Vec::new(),
        });
        self.log(Mutation::CreateElement { node, tag });
        node
    }

    fn create_text(&self, text: &str) -> NodeId {
        let node = self
            .inner
            .borrow_mut()
            .push(Data::Text(text.to_string()));
        self.log(Mutation::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.inner.borrow().node(node).map(|n| match n.data {
            Data::Element { .. } => NodeKind::Element,
            Data::Text(_) => NodeKind::Text,
        })
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().node(node)?.data {
            Data::Element { tag, .. } => Some(tag.clone()),
            Data::Text(_) => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().node(node)?.data {
            Data::Text(text) => Some(text.clone()),
            Data::Element { .. } => None,
        }
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.inner.borrow().node(node).map(|n| &n.data) {
            Some(Data::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.inner.borrow().node(node)?.data {
            Data::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            Data::Text(_) => None,
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        {
            let mut inner = self.inner.borrow_mut();
            let Some(MemNode {
                data: Data::Element { attrs, .. },
                ..
            }) = inner.node_mut(node)
            else {
                return;
            };
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(attr) => attr.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
        self.log(Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(MemNode {
                data: Data::Element { attrs, .. },
                ..
            }) = inner.node_mut(node)
            {
                attrs.retain(|(n, _)| n != name);
            }
        }
        self.log(Mutation::RemoveAttribute {
            node,
            name: name.to_string(),
        });
    }

    fn set_text(&self, node: NodeId, text: &str) {
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(MemNode {
                data: Data::Text(content),
                ..
            }) = inner.node_mut(node)
            {
                *content = text.to_string();
            }
        }
        self.log(Mutation::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn value(&self, node: NodeId) -> Option<String> {
        let from_property = self.inner.borrow().node(node)?.value.clone();
        from_property.or_else(|| self.attribute(node, "value"))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        self.inner.borrow_mut().attach(parent, child, None);
        self.log(Mutation::Append { parent, child });
    }

    fn insert_before(&self, parent: NodeId, child: NodeId, reference: NodeId) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.detach(child);
            let at = inner.position(parent, reference);
            inner.attach(parent, child, at);
        }
        self.log(Mutation::InsertBefore {
            parent,
            child,
            reference,
        });
    }

    fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.detach(new);
            let at = inner.position(parent, old);
            inner.detach(old);
            inner.attach(parent, new, at);
        }
        self.log(Mutation::Replace { parent, new, old });
    }

    fn remove_child(&self, parent: NodeId, child: NodeId) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.node(child).and_then(|n| n.parent) == Some(parent) {
                inner.detach(child);
            }
        }
        self.log(Mutation::Remove { parent, child });
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn add_listener(&self, node: NodeId, event_type: &str, listener: Listener) -> ListenerId {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = ListenerId(inner.next_listener);
            inner.next_listener += 1;
            if let Some(n) = inner.node_mut(node) {
                n.listeners.push((id, event_type.to_string(), listener));
            }
            id
        };
        self.log(Mutation::AddListener {
            node,
            event_type: event_type.to_string(),
        });
        id
    }

    fn remove_listener(&self, node: NodeId, id: ListenerId) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let Some(n) = inner.node_mut(node) else { return };
            let removed = n
                .listeners
                .iter()
                .find(|(lid, _, _)| *lid == id)
                .map(|(_, ty, _)| ty.clone());
            n.listeners.retain(|(lid, _, _)| *lid != id);
            removed
        };
        if let Some(event_type) = removed {
            self.log(Mutation::RemoveListener { node, event_type });
        }
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        self.find(self.body(), selector)
    }
}

// =============================================================================
// Tests
// =============================================================================
