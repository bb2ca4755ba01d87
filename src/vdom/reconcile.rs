//! Reconciler.
//!
//! Single pass, sibling-aligned, unkeyed: the previous children and the new
//! children are walked in lockstep.
//!
//! | previous | new | action |
//! |---|---|---|
//! | none | node | create and append |
//! | node | none | remove |
//! | text | text | update text if it differs |
//! | element | element, same tag | patch attributes, recurse |
//! | placeholder | same subcomponent root | nothing (the subcomponent patched itself) |
//! | anything else | | replace |
//!
//! A subcomponent root is never recreated: its live node is moved into place.
//! Because a root can move between positions in one pass, placeholders whose
//! root is claimed by the new tree are never removed from the live tree, and
//! sibling lists holding subcomponents get an order check at the end.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::dom::{Dom, NodeId};
use crate::template::Node;

use super::report::PatchReport;
use super::tree::{VKind, VNodeId, VTree};

pub struct Reconciler<'a> {
    dom: &'a dyn Dom,
    tree: &'a mut VTree,
    claimed: HashSet<NodeId>,
    report: PatchReport,
}

impl<'a> Reconciler<'a> {
    pub fn new(dom: &'a dyn Dom, tree: &'a mut VTree) -> Self {
        Self {
            dom,
            tree,
            claimed: HashSet::new(),
            report: PatchReport::default(),
        }
    }

    /// Patch the children of a mount container to match `nodes`.
    pub fn patch_container(mut self, container: NodeId, nodes: Vec<Node>) -> PatchReport {
        self.claim(&nodes);
        self.children(None, Some(container), nodes, true);
        self.report
    }

    /// Patch a subcomponent's single root.
    ///
    /// `host` is the live parent the root currently sits in, if any. A
    /// replaced root is swapped in place there; a detached root is left for
    /// the parent's reconciler to place.
    pub fn patch_root(mut self, host: Option<NodeId>, root: Node) -> PatchReport {
        let nodes = vec![root];
        self.claim(&nodes);
        self.children(None, host, nodes, false);
        self.report
    }

    fn claim(&mut self, nodes: &[Node]) {
        let mut roots = Vec::new();
        for node in nodes {
            node.mounted_roots(&mut roots);
        }
        self.claimed = roots.into_iter().collect();
    }

    fn children(&mut self, parent: Option<VNodeId>, live: Option<NodeId>, nodes: Vec<Node>, ordered: bool) {
        let has_components = nodes.iter().any(|n| matches!(n, Node::Component(_)));
        let mut needs_sync = false;

        let mut current = self.tree.first_child(parent);
        for node in nodes {
            match current {
                None => {
                    let id = self.create(node);
                    self.tree.append(parent, id);
                    if let (Some(live), Some(child)) = (live, self.tree.live(id)) {
                        self.dom.append_child(live, child);
                    }
                }
                Some(old) => {
                    current = self.tree.next_sibling(old);
                    needs_sync |= self.patch(old, node, live);
                }
            }
        }
        while let Some(old) = current {
            current = self.tree.next_sibling(old);
            self.remove(old, live);
        }

        if ordered && (has_components || needs_sync) {
            if let Some(live) = live {
                self.sync_order(parent, live);
            }
        }
    }

    /// Patch `old` toward `node`. Returns true if sibling order may be off.
    fn patch(&mut self, old: VNodeId, node: Node, live: Option<NodeId>) -> bool {
        let Some(vnode) = self.tree.get(old) else {
            return false;
        };
        let node_id = vnode.node;
        match (&vnode.kind, node) {
            (VKind::Element(tag), Node::Element(el)) if *tag == el.tag => {
                self.patch_attrs(old, node_id, el.attrs);
                self.children(Some(old), Some(node_id), el.children, true);
                false
            }
            (VKind::Text(current), Node::Text(text)) => {
                if *current != text {
                    log::trace!("text {:?} -> {:?}", current, text);
                    self.dom.set_text(node_id, &text);
                    if let Some(v) = self.tree.get_mut(old) {
                        v.kind = VKind::Text(text);
                    }
                    self.report.text_updates += 1;
                }
                false
            }
            (VKind::Component(_), Node::Component(mounted)) if mounted.root == node_id => false,
            (_, node) => self.replace(old, node, live),
        }
    }

    fn patch_attrs(&mut self, id: VNodeId, node: NodeId, attrs: Vec<(String, String)>) {
        let next: IndexMap<String, String> = attrs.into_iter().collect();
        let Some(vnode) = self.tree.get_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut vnode.attrs, next.clone());

        for (name, value) in &next {
            if previous.get(name) != Some(value) {
                self.dom.set_attribute(node, name, value);
                self.report.attr_sets += 1;
            }
        }
        for name in previous.keys() {
            if !next.contains_key(name) {
                self.dom.remove_attribute(node, name);
                self.report.attr_removals += 1;
            }
        }
    }

    fn replace(&mut self, old: VNodeId, node: Node, live: Option<NodeId>) -> bool {
        let Some(vnode) = self.tree.get(old) else {
            return false;
        };
        let old_node = vnode.node;
        let old_claimed = vnode.is_component() && self.claimed.contains(&old_node);

        let id = self.create(node);
        let mut needs_sync = false;
        if let (Some(live), Some(new_node)) = (live, self.tree.live(id)) {
            if !old_claimed && self.dom.parent(old_node) == Some(live) {
                self.dom.replace_child(live, new_node, old_node);
            } else {
                if self.dom.parent(new_node) != Some(live) {
                    self.dom.append_child(live, new_node);
                }
                needs_sync = true;
            }
        }
        log::trace!("replace {:?} with {:?}", old_node, self.tree.live(id));
        self.tree.replace(old, id);
        self.report.replaced += 1;
        needs_sync
    }

    fn remove(&mut self, old: VNodeId, live: Option<NodeId>) {
        let Some(vnode) = self.tree.get(old) else {
            return;
        };
        let node = vnode.node;
        let claimed = vnode.is_component() && self.claimed.contains(&node);
        if let Some(live) = live {
            if !claimed && self.dom.parent(node) == Some(live) {
                self.dom.remove_child(live, node);
            }
        }
        log::trace!("remove {:?}", node);
        self.tree.remove(old);
        self.report.removed += 1;
    }

    /// Build a detached VNode subtree (and live subtree) for `node`.
    fn create(&mut self, node: Node) -> VNodeId {
        match node {
            Node::Element(el) => {
                let live = self.dom.create_element(&el.tag);
                for (name, value) in &el.attrs {
                    self.dom.set_attribute(live, name, value);
                }
                let attrs = el.attrs.into_iter().collect();
                let id = self.tree.alloc(VKind::Element(el.tag), attrs, live);
                self.report.created += 1;
                for child in el.children {
                    let child_id = self.create(child);
                    self.tree.append(Some(id), child_id);
                    if let Some(child_live) = self.tree.live(child_id) {
                        self.dom.append_child(live, child_live);
                    }
                }
                id
            }
            Node::Text(text) => {
                let live = self.dom.create_text(&text);
                self.report.created += 1;
                self.tree.alloc(VKind::Text(text), IndexMap::new(), live)
            }
            Node::Component(mounted) => {
                self.report.moved += 1;
                self.tree
                    .alloc(VKind::Component(mounted.tag), IndexMap::new(), mounted.root)
            }
        }
    }

    /// Make the live children of `live` follow the VNode order.
    fn sync_order(&mut self, parent: Option<VNodeId>, live: NodeId) {
        let expected = self.tree.live_children(parent);
        if self.dom.children(live) == expected {
            return;
        }
        log::debug!("reordering {} children of {:?}", expected.len(), live);
        let mut actual = self.dom.children(live);
        for (i, node) in expected.iter().enumerate() {
            match actual.get(i).copied() {
                Some(at) if at == *node => continue,
                Some(at) => self.dom.insert_before(live, *node, at),
                None => self.dom.append_child(live, *node),
            }
            self.report.moved += 1;
            actual = self.dom.children(live);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDom, Mutation};
    use crate::template::{Element, Mounted};
    use pretty_assertions::assert_eq;

    fn el(tag: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
        let mut element = Element::new(tag);
        for (name, value) in attrs {
            element.set_attr(*name, *value);
        }
        element.children = children;
        Node::Element(element)
    }

    fn list(items: &[&str]) -> Vec<Node> {
        vec![el(
            "ul",
            &[],
            items
                .iter()
                .map(|i| el("li", &[], vec![Node::text(*i)]))
                .collect(),
        )]
    }

    fn setup() -> (MemoryDom, NodeId, VTree) {
        let dom = MemoryDom::new();
        let app = dom.element(dom.body(), "div", &[("id", "app")]);
        dom.take_mutations();
        (dom, app, VTree::new())
    }

    #[test]
    fn test_initial_create() {
        let (dom, app, mut tree) = setup();
        let report = Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b"]));
        assert_eq!(dom.inner_html(app), "<ul><li>a</li><li>b</li></ul>");
        assert_eq!(report.created, 5);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_stable_render_is_noop() {
        let (dom, app, mut tree) = setup();
        Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b"]));
        dom.take_mutations();

        let report = Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b"]));
        assert!(report.is_noop(), "{:?}", report);
        assert!(dom.take_mutations().is_empty());
    }

    #[test]
    fn test_append_keeps_existing_nodes() {
        let (dom, app, mut tree) = setup();
        Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b", "c"]));
        let ul = dom.children(app)[0];
        let before = dom.children(ul);
        dom.take_mutations();

        let report = Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b", "c", "d"]));
        let after = dom.children(ul);
        assert_eq!(&after[..3], &before[..]);
        assert_eq!(report.created, 2, "one li and its text");
        assert!(
            dom.take_mutations()
                .iter()
                .all(|m| !matches!(m, Mutation::SetText { .. } | Mutation::Remove { .. }))
        );
    }

    #[test]
    fn test_remove_tail() {
        let (dom, app, mut tree) = setup();
        Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b", "c"]));
        let ul = dom.children(app)[0];
        let before = dom.children(ul);

        let report = Reconciler::new(&dom, &mut tree).patch_container(app, list(&["a", "b"]));
        assert_eq!(report.removed, 1);
        assert_eq!(dom.children(ul), before[..2].to_vec());
    }

    #[test]
    fn test_text_and_attribute_patch() {
        let (dom, app, mut tree) = setup();
        Reconciler::new(&dom, &mut tree).patch_container(
            app,
            vec![el("p", &[("class", "a"), ("title", "t")], vec![Node::text("x")])],
        );
        dom.take_mutations();

        let report = Reconciler::new(&dom, &mut tree).patch_container(
            app,
            vec![el("p", &[("class", "b"), ("id", "n")], vec![Node::text("y")])],
        );
        assert_eq!(report.text_updates, 1);
        assert_eq!(report.attr_sets, 2);
        assert_eq!(report.attr_removals, 1);
        assert_eq!(dom.inner_html(app), "<p class=\"b\" id=\"n\">y</p>");
    }

    #[test]
    fn test_tag_change_replaces() {
        let (dom, app, mut tree) = setup();
        Reconciler::new(&dom, &mut tree).patch_container(app, vec![el("div", &[], vec![el("p", &[], vec![])])]);
        let report = Reconciler::new(&dom, &mut tree)
            .patch_container(app, vec![el("div", &[], vec![el("span", &[], vec![])])]);
        assert_eq!(report.replaced, 1);
        assert_eq!(dom.inner_html(app), "<div><span></span></div>");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_component_root_is_moved_not_recreated() {
        let (dom, app, mut tree) = setup();
        let child_root = dom.create_element("section");
        let mounted = || {
            Node::Component(Mounted {
                tag: "child".to_string(),
                root: child_root,
            })
        };

        Reconciler::new(&dom, &mut tree)
            .patch_container(app, vec![el("div", &[], vec![el("p", &[], vec![]), mounted()])]);
        assert_eq!(dom.inner_html(app), "<div><p></p><section></section></div>");

        // The paragraph disappears: the root shifts left and must survive.
        let report = Reconciler::new(&dom, &mut tree).patch_container(app, vec![el("div", &[], vec![mounted()])]);
        assert_eq!(dom.inner_html(app), "<div><section></section></div>");
        assert_eq!(report.replaced, 1);
        assert_eq!(report.created, 0);

        // And reappears in front of it.
        Reconciler::new(&dom, &mut tree)
            .patch_container(app, vec![el("div", &[], vec![el("p", &[], vec![]), mounted()])]);
        assert_eq!(dom.inner_html(app), "<div><p></p><section></section></div>");
        let div = dom.children(app)[0];
        assert_eq!(dom.children(div)[1], child_root);
    }

    #[test]
    fn test_swapped_component_roots_move_once() {
        let (dom, app, mut tree) = setup();
        let a = dom.create_element("a");
        let b = dom.create_element("b");
        let mounted = |root| {
            Node::Component(Mounted {
                tag: "child".to_string(),
                root,
            })
        };

        Reconciler::new(&dom, &mut tree)
            .patch_container(app, vec![el("div", &[], vec![mounted(a), mounted(b)])]);
        let div = dom.children(app)[0];
        dom.take_mutations();

        Reconciler::new(&dom, &mut tree)
            .patch_container(app, vec![el("div", &[], vec![mounted(b), mounted(a)])]);
        assert_eq!(dom.children(div), vec![b, a]);
        assert_eq!(
            dom.take_mutations(),
            vec![Mutation::InsertBefore {
                parent: div,
                child: b,
                reference: a,
            }]
        );
    }

    #[test]
    fn test_patch_root_detached_then_swapped() {
        let dom = MemoryDom::new();
        let mut tree = VTree::new();
        Reconciler::new(&dom, &mut tree).patch_root(None, el("p", &[], vec![]));
        let first = tree.root_node();
        assert_eq!(first.and_then(|n| dom.parent(n)), None, "no host, stays detached");

        let host = dom.element(dom.body(), "div", &[]);
        if let Some(root) = first {
            dom.append_child(host, root);
        }
        Reconciler::new(&dom, &mut tree).patch_root(Some(host), el("span", &[], vec![]));
        assert_eq!(dom.inner_html(host), "<span></span>");
    }
}
