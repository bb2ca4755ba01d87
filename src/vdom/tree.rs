//! Shadow tree arena.
//!
//! VNodes live in a flat arena addressed by [`VNodeId`]. Parent, child and
//! sibling links are ids, never references, so the tree has no ownership
//! cycles and serializes cleanly. Released slots go to a free list and are
//! reused by the next allocation.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::dom::{Dom, NodeId, NodeKind};
use crate::error::Result;

/// Handle to a node in a [`VTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct VNodeId(pub usize);

/// What a VNode mirrors.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VKind {
    Element(String),
    Text(String),
    /// Placeholder for a subcomponent root; the subtree belongs to the
    /// subcomponent's own tree.
    Component(String),
}

/// One shadow node.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VNode {
    pub kind: VKind,
    /// Always equal to the live node's attributes at rest.
    pub attrs: IndexMap<String, String>,
    pub parent: Option<VNodeId>,
    pub first_child: Option<VNodeId>,
    pub last_child: Option<VNodeId>,
    pub prev_sibling: Option<VNodeId>,
    pub next_sibling: Option<VNodeId>,
    /// The live node this VNode mirrors.
    pub node: NodeId,
}

impl VNode {
    pub fn is_component(&self) -> bool {
        matches!(self.kind, VKind::Component(_))
    }
}

/// The persistent shadow tree of one view model.
///
/// Top-level nodes have no parent; their first/last links are held by the
/// tree itself.
#[derive(Debug, Default)]
pub struct VTree {
    nodes: Vec<Option<VNode>>,
    free: Vec<usize>,
    first: Option<VNodeId>,
    last: Option<VNodeId>,
}

impl VTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the existing children of `container`.
    pub fn from_live(dom: &dyn Dom, container: NodeId) -> Self {
        let mut tree = Self::new();
        for child in dom.children(container) {
            if let Some(id) = tree.mirror(dom, child) {
                tree.append(None, id);
            }
        }
        tree
    }

    fn mirror(&mut self, dom: &dyn Dom, node: NodeId) -> Option<VNodeId> {
        match dom.kind(node)? {
            NodeKind::Text => {
                let text = dom.text(node).unwrap_or_default();
                Some(self.alloc(VKind::Text(text), IndexMap::new(), node))
            }
            NodeKind::Element => {
                let tag = dom.tag(node)?.to_ascii_lowercase();
                let attrs = dom.attributes(node).into_iter().collect();
                let id = self.alloc(VKind::Element(tag), attrs, node);
                for child in dom.children(node) {
                    if let Some(child_id) = self.mirror(dom, child) {
                        self.append(Some(id), child_id);
                    }
                }
                Some(id)
            }
        }
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a detached node, reusing a freed slot if one exists.
    pub fn alloc(&mut self, kind: VKind, attrs: IndexMap<String, String>, node: NodeId) -> VNodeId {
        let vnode = VNode {
            kind,
            attrs,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            node,
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(vnode);
                VNodeId(index)
            }
            None => {
                self.nodes.push(Some(vnode));
                VNodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Free `id` and its whole subtree. The node must already be unlinked.
    fn release(&mut self, id: VNodeId) {
        let mut child = self.get(id).and_then(|n| n.first_child);
        while let Some(c) = child {
            child = self.get(c).and_then(|n| n.next_sibling);
            self.release(c);
        }
        if let Some(slot) = self.nodes.get_mut(id.0) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn get(&self, id: VNodeId) -> Option<&VNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: VNodeId) -> Option<&mut VNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live node of `id`.
    pub fn live(&self, id: VNodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.node)
    }

    pub fn first_child(&self, parent: Option<VNodeId>) -> Option<VNodeId> {
        match parent {
            Some(p) => self.get(p).and_then(|n| n.first_child),
            None => self.first,
        }
    }

    pub fn next_sibling(&self, id: VNodeId) -> Option<VNodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Children of `parent` (top-level nodes for `None`), in order.
    pub fn children(&self, parent: Option<VNodeId>) -> Vec<VNodeId> {
        let mut out = Vec::new();
        let mut child = self.first_child(parent);
        while let Some(c) = child {
            out.push(c);
            child = self.next_sibling(c);
        }
        out
    }

    /// Live nodes of the children of `parent`, in order.
    pub fn live_children(&self, parent: Option<VNodeId>) -> Vec<NodeId> {
        self.children(parent)
            .into_iter()
            .filter_map(|c| self.live(c))
            .collect()
    }

    /// Live node of the first top-level node.
    pub fn root_node(&self) -> Option<NodeId> {
        self.first.and_then(|id| self.live(id))
    }

    /// Number of live VNodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    // =========================================================================
    // Linking
    // =========================================================================

    fn set_first(&mut self, parent: Option<VNodeId>, value: Option<VNodeId>) {
        match parent {
            Some(p) => {
                if let Some(n) = self.get_mut(p) {
                    n.first_child = value;
                }
            }
            None => self.first = value,
        }
    }

    fn set_last(&mut self, parent: Option<VNodeId>, value: Option<VNodeId>) {
        match parent {
            Some(p) => {
                if let Some(n) = self.get_mut(p) {
                    n.last_child = value;
                }
            }
            None => self.last = value,
        }
    }

    fn last_child(&self, parent: Option<VNodeId>) -> Option<VNodeId> {
        match parent {
            Some(p) => self.get(p).and_then(|n| n.last_child),
            None => self.last,
        }
    }

    fn set_prev(&mut self, id: VNodeId, value: Option<VNodeId>) {
        if let Some(n) = self.get_mut(id) {
            n.prev_sibling = value;
        }
    }

    fn set_next(&mut self, id: VNodeId, value: Option<VNodeId>) {
        if let Some(n) = self.get_mut(id) {
            n.next_sibling = value;
        }
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append(&mut self, parent: Option<VNodeId>, child: VNodeId) {
        let prev = self.last_child(parent);
        match prev {
            Some(p) => self.set_next(p, Some(child)),
            None => self.set_first(parent, Some(child)),
        }
        self.set_last(parent, Some(child));
        if let Some(n) = self.get_mut(child) {
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = None;
        }
    }

    /// Detach `id` from its siblings without freeing it.
    fn unlink(&mut self, id: VNodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.set_first(parent, next),
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.set_last(parent, prev),
        }
        if let Some(n) = self.get_mut(id) {
            n.parent = None;
            n.prev_sibling = None;
            n.next_sibling = None;
        }
    }

    /// Put detached `new` in the position of `old`, then free `old`'s subtree.
    pub fn replace(&mut self, old: VNodeId, new: VNodeId) {
        let Some((parent, prev, next)) = self
            .get(old)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };
        match prev {
            Some(p) => self.set_next(p, Some(new)),
            None => self.set_first(parent, Some(new)),
        }
        match next {
            Some(n) => self.set_prev(n, Some(new)),
            None => self.set_last(parent, Some(new)),
        }
        if let Some(n) = self.get_mut(new) {
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = next;
        }
        if let Some(n) = self.get_mut(old) {
            n.parent = None;
            n.prev_sibling = None;
            n.next_sibling = None;
        }
        self.release(old);
    }

    /// Unlink `id` and free its subtree.
    pub fn remove(&mut self, id: VNodeId) {
        self.unlink(id);
        self.release(id);
    }

    /// Pretty JSON dump of the tree, for debugging.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// Serialization (nested, not the raw arena)
// =============================================================================

struct Nested<'a> {
    tree: &'a VTree,
    id: VNodeId,
}

struct Siblings<'a> {
    tree: &'a VTree,
    parent: Option<VNodeId>,
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let Some(node) = self.tree.get(self.id) else {
            return serializer.serialize_none();
        };
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", &node.kind)?;
        map.serialize_entry("node", &node.node)?;
        if !node.attrs.is_empty() {
            map.serialize_entry("attrs", &node.attrs)?;
        }
        if node.first_child.is_some() {
            map.serialize_entry(
                "children",
                &Siblings {
                    tree: self.tree,
                    parent: Some(self.id),
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for Siblings<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let children = self.tree.children(self.parent);
        let mut seq = serializer.serialize_seq(Some(children.len()))?;
        for id in children {
            seq.serialize_element(&Nested {
                tree: self.tree,
                id,
            })?;
        }
        seq.end()
    }
}

impl Serialize for VTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Siblings {
            tree: self,
            parent: None,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    fn text(tree: &mut VTree, s: &str, n: usize) -> VNodeId {
        tree.alloc(VKind::Text(s.to_string()), IndexMap::new(), NodeId(n))
    }

    #[test]
    fn test_append_and_children() {
        let mut tree = VTree::new();
        let a = text(&mut tree, "a", 1);
        let b = text(&mut tree, "b", 2);
        tree.append(None, a);
        tree.append(None, b);
        assert_eq!(tree.children(None), vec![a, b]);
        assert_eq!(tree.live_children(None), vec![NodeId(1), NodeId(2)]);
        assert_eq!(tree.root_node(), Some(NodeId(1)));
    }

    #[test]
    fn test_remove_relinks_and_frees() {
        let mut tree = VTree::new();
        let ids: Vec<_> = (0..3).map(|i| text(&mut tree, "x", i)).collect();
        for id in &ids {
            tree.append(None, *id);
        }
        tree.remove(ids[1]);
        assert_eq!(tree.children(None), vec![ids[0], ids[2]]);
        assert_eq!(tree.len(), 2);

        let reused = text(&mut tree, "y", 9);
        assert_eq!(reused, ids[1], "freed slot is reused");
    }

    #[test]
    fn test_replace_frees_subtree() {
        let mut tree = VTree::new();
        let div = tree.alloc(VKind::Element("div".to_string()), IndexMap::new(), NodeId(1));
        tree.append(None, div);
        let inner = text(&mut tree, "in", 2);
        tree.append(Some(div), inner);

        let p = tree.alloc(VKind::Element("p".to_string()), IndexMap::new(), NodeId(3));
        tree.replace(div, p);
        assert_eq!(tree.children(None), vec![p]);
        assert_eq!(tree.len(), 1, "div and its text are freed");
    }

    #[test]
    fn test_from_live_mirrors_dom() {
        let dom = MemoryDom::new();
        let app = dom.element(dom.body(), "div", &[("id", "app")]);
        let p = dom.element(app, "P", &[("class", "x")]);
        dom.text_node(p, "hi");

        let tree = VTree::from_live(&dom, app);
        let roots = tree.children(None);
        assert_eq!(roots.len(), 1);
        let root = tree.get(roots[0]).map(|n| (n.kind.clone(), n.attrs.clone()));
        let mut attrs = IndexMap::new();
        attrs.insert("class".to_string(), "x".to_string());
        assert_eq!(root, Some((VKind::Element("p".to_string()), attrs)));

        let json = tree.to_json().unwrap();
        assert!(json.contains("\"hi\""), "{}", json);
    }
}
