//! View model - one live instance of a component.
//!
//! A render pass runs, in order:
//!
//! 1. map data, props and computed properties into a new snapshot
//! 2. fire watchers for keys whose value changed since the last snapshot
//! 3. execute the template (subcomponents render as they are reached)
//! 4. reconcile the executed tree against the shadow tree
//! 5. release subcomponents this pass did not reach
//! 6. attach native listeners for newly requested event types
//!
//! The root view model patches the children of its mount container. A
//! subcomponent patches its single root; the parent places that root.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::dom::{Event, Listener, ListenerId, NodeId};
use crate::error::{Error, Result};
use crate::state::{map_state, DataCell, State};
use crate::template::{key_matches, Executor, Host};
use crate::types::Value;
use crate::vdom::{PatchReport, Reconciler, VTree};

use super::bus::{Bus, Caller};
use super::context::Context;
use super::definition::Component;
use super::pool::Pool;
use super::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mount {
    /// Root: owns the children of this container.
    Container(NodeId),
    /// Subcomponent: owns a single root placed by its parent.
    Child,
}

pub struct ViewModel {
    def: Rc<Component>,
    rt: Rc<Runtime>,
    data: DataCell,
    props: RefCell<IndexMap<String, Value>>,
    state: RefCell<State>,
    /// One native listener per event type.
    listeners: RefCell<IndexMap<String, ListenerId>>,
    listen_node: Cell<Option<NodeId>>,
    bus: Rc<Bus>,
    pool: RefCell<Pool>,
    tree: RefCell<VTree>,
    mount: Mount,
    loop_counter: Cell<usize>,
    rendering: Cell<bool>,
    released: Cell<bool>,
    this: Weak<ViewModel>,
}

impl ViewModel {
    pub(crate) fn root(def: Rc<Component>, rt: Rc<Runtime>, container: NodeId) -> Rc<Self> {
        let tree = VTree::from_live(&*rt.dom, container);
        Self::build(def, rt, None, Mount::Container(container), tree)
    }

    pub(crate) fn child(def: Rc<Component>, rt: Rc<Runtime>, parent_bus: Rc<Bus>) -> Rc<Self> {
        Self::build(def, rt, Some(parent_bus), Mount::Child, VTree::new())
    }

    fn build(
        def: Rc<Component>,
        rt: Rc<Runtime>,
        parent_bus: Option<Rc<Bus>>,
        mount: Mount,
        tree: VTree,
    ) -> Rc<Self> {
        let data = def.instantiate_data();
        Rc::new_cyclic(|this: &Weak<ViewModel>| {
            let caller: Weak<dyn Caller> = this.clone();
            let bus = Rc::new(Bus::new(def.name(), parent_bus, caller));
            Self {
                def,
                rt,
                data,
                props: RefCell::new(IndexMap::new()),
                state: RefCell::new(State::new()),
                listeners: RefCell::new(IndexMap::new()),
                listen_node: Cell::new(None),
                bus,
                pool: RefCell::new(Pool::new()),
                tree: RefCell::new(tree),
                mount,
                loop_counter: Cell::new(0),
                rendering: Cell::new(false),
                released: Cell::new(false),
                this: this.clone(),
            }
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn component(&self) -> &Rc<Component> {
        &self.def
    }

    pub fn data(&self) -> &DataCell {
        &self.data
    }

    /// Value of a data field, else a prop, else a snapshot entry (computed).
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.data.get(name) {
            Err(Error::UnknownField(_)) => {}
            other => return other,
        }
        if let Some(value) = self.prop(name) {
            return Ok(value);
        }
        self.state
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Write a data field. Takes effect on the next render.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        log::trace!("{}: set {} = {:?}", self.name(), name, value);
        self.data.set(name, value)
    }

    pub fn prop(&self, name: &str) -> Option<Value> {
        self.props.borrow().get(name).cloned()
    }

    /// Snapshot of the last render.
    pub fn state(&self) -> State {
        self.state.borrow().clone()
    }

    /// Live root element, once rendered.
    pub fn root_node(&self) -> Option<NodeId> {
        self.tree.borrow().root_node()
    }

    /// Live subcomponent instances.
    pub fn children(&self) -> Vec<Rc<ViewModel>> {
        self.pool.borrow().instances()
    }

    /// Number of native listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Pretty JSON dump of the shadow tree.
    pub fn tree_json(&self) -> Result<String> {
        self.tree.borrow().to_json()
    }

    pub(crate) fn bus(&self) -> &Rc<Bus> {
        &self.bus
    }

    pub(crate) fn runtime(&self) -> &Rc<Runtime> {
        &self.rt
    }

    pub(crate) fn downgrade(&self) -> Weak<ViewModel> {
        self.this.clone()
    }

    pub(crate) fn merge_props(&self, pending: IndexMap<String, Value>) {
        let mut props = self.props.borrow_mut();
        for (name, value) in pending {
            props.insert(name, value);
        }
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Run a method, then re-render. Unknown names are a no-op.
    ///
    /// Effects the method requests run once the outermost engine call
    /// returns.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<()> {
        self.rt.run(|| self.invoke(method, args))
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<()> {
        if self.released.get() {
            log::warn!("{}: call {} after release", self.name(), method);
            return Ok(());
        }
        let Some(handler) = self.def.methods.get(method).cloned() else {
            log::debug!("{}: no method {}, ignored", self.name(), method);
            return Ok(());
        };
        log::debug!("{}: call {}", self.name(), method);
        let mut ctx = Context::new(self, args);
        handler(&mut ctx)?;
        self.render()?;
        Ok(())
    }

    // =========================================================================
    // Render
    // =========================================================================

    pub fn render(&self) -> Result<PatchReport> {
        self.rt.run(|| self.render_guarded())
    }

    fn render_guarded(&self) -> Result<PatchReport> {
        if self.released.get() {
            log::warn!("{}: render after release", self.name());
            return Ok(PatchReport::default());
        }
        if self.rendering.replace(true) {
            return Err(Error::RenderBusy(self.name().to_string()));
        }
        let result = self.render_pass();
        self.rendering.set(false);
        result
    }

    fn render_pass(&self) -> Result<PatchReport> {
        let mapped = map_state(&self.data, &self.props.borrow(), &self.def.computed)?;

        let changes = mapped.changes_since(&self.state.borrow());
        let mut working = mapped.clone();
        *self.state.borrow_mut() = mapped;

        // Every change is delivered once, even if an earlier watcher fails.
        let mut failed = None;
        for change in changes {
            if let Some(watcher) = self.def.watchers.get(&change.key).cloned() {
                log::debug!("{}: watcher {} fired", self.name(), change.key);
                let mut ctx = Context::new(self, &[]);
                if let Err(err) = watcher(&mut ctx, &change.new, &change.old) {
                    log::warn!("{}: watcher {} failed: {}", self.name(), change.key, err);
                    failed.get_or_insert(err);
                }
            }
        }
        if let Some(err) = failed {
            return Err(err);
        }

        self.bus.clear();
        self.pool.borrow_mut().begin();
        let mut host = RenderHost {
            vm: self,
            listen: IndexSet::new(),
            report: PatchReport::default(),
        };
        let root = Executor::new(&self.rt.config, &mut working, &mut host).run(self.def.template())?;
        let RenderHost {
            listen, mut report, ..
        } = host;

        let patch = {
            let dom = &*self.rt.dom;
            let mut tree = self.tree.borrow_mut();
            match self.mount {
                Mount::Container(container) => {
                    Reconciler::new(dom, &mut tree).patch_container(container, vec![root])
                }
                Mount::Child => {
                    let host = tree.root_node().and_then(|node| dom.parent(node));
                    Reconciler::new(dom, &mut tree).patch_root(host, root)
                }
            }
        };
        let released = self.pool.borrow_mut().end();
        self.sync_listeners(&listen);

        log::debug!(
            "{}: rendered, {} live ops, {} subcomponents released",
            self.name(),
            patch.total(),
            released
        );
        report.merge(&patch);
        Ok(report)
    }

    /// Attach listeners for new event types; move all of them if the node
    /// they live on changed.
    fn sync_listeners(&self, requested: &IndexSet<String>) {
        let node = match self.mount {
            Mount::Container(container) => Some(container),
            Mount::Child => self.root_node(),
        };
        let Some(node) = node else {
            return;
        };
        let dom = &self.rt.dom;
        let mut listeners = self.listeners.borrow_mut();

        if let Some(previous) = self.listen_node.get().filter(|p| *p != node) {
            log::trace!("{}: moving listeners {:?} -> {:?}", self.name(), previous, node);
            let types: Vec<String> = listeners.keys().cloned().collect();
            for (_, id) in listeners.drain(..) {
                dom.remove_listener(previous, id);
            }
            for event_type in types {
                let id = dom.add_listener(node, &event_type, self.listener());
                listeners.insert(event_type, id);
            }
        }
        self.listen_node.set(Some(node));

        for event_type in requested {
            if !listeners.contains_key(event_type) {
                log::trace!("{}: listening for {}", self.name(), event_type);
                let id = dom.add_listener(node, event_type, self.listener());
                listeners.insert(event_type.clone(), id);
            }
        }
    }

    fn listener(&self) -> Listener {
        let vm = self.this.clone();
        Rc::new(move |event: &mut Event| {
            let Some(vm) = vm.upgrade() else {
                log::warn!("event {} reached a dropped view model", event.event_type);
                return;
            };
            let rt = vm.rt.clone();
            if let Err(err) = rt.run(|| vm.handle_event(event)) {
                rt.report(err);
            }
        })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Handle a native event that reached this view model's listener.
    ///
    /// Only handler attributes between the target and this view model's own
    /// root are considered; anything else is left to propagate.
    pub(crate) fn handle_event(&self, event: &mut Event) -> Result<()> {
        if self.released.get() {
            log::warn!("{}: {} fired after release", self.name(), event.event_type);
            return Ok(());
        }
        let dom = self.rt.dom.clone();
        let config = &self.rt.config;
        let boundary = self.listen_node.get();
        let inclusive = self.mount == Mount::Child;

        let mut current = Some(event.target);
        while let Some(node) = current {
            if Some(node) == boundary && !inclusive {
                break;
            }

            if event.event_type == config.model_event {
                if let Some(field) = dom.attribute(node, &config.model_attr()) {
                    event.stop_propagation();
                    let value = dom.value(node).unwrap_or_default();
                    log::debug!("{}: model {} = {:?}", self.name(), field, value);
                    self.set(&field, Value::Str(value))?;
                    self.render()?;
                    return Ok(());
                }
            }

            if let Some(method) = dom.attribute(node, &config.on_attr(&event.event_type)) {
                event.stop_propagation();
                if let Some(keys) = dom.attribute(node, &config.keys_attr(&event.event_type)) {
                    let pressed = event.key.as_deref().unwrap_or_default();
                    if !key_matches(&keys, pressed) {
                        log::trace!("{}: key {:?} filtered by {:?}", self.name(), pressed, keys);
                        return Ok(());
                    }
                }
                self.bus.publish(&event.event_type, &method, &[])?;
                return Ok(());
            }

            if Some(node) == boundary {
                break;
            }
            current = dom.parent(node);
        }
        Ok(())
    }

    // =========================================================================
    // Release
    // =========================================================================

    /// Detach every listener of this view model and its subcomponents.
    pub(crate) fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        if let Some(node) = self.listen_node.take() {
            for (_, id) in self.listeners.borrow_mut().drain(..) {
                self.rt.dom.remove_listener(node, id);
            }
        }
        self.bus.clear();
        self.pool.borrow_mut().clear();
        log::debug!("{}: released", self.name());
    }
}

impl Caller for ViewModel {
    fn call(&self, method: &str, args: &[Value]) -> Result<()> {
        ViewModel::call(self, method, args)
    }
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModel")
            .field("name", &self.def.name())
            .field("mount", &self.mount)
            .field("props", &self.props.borrow())
            .field("listeners", &self.listeners.borrow().keys().collect::<Vec<_>>())
            .field("released", &self.released.get())
            .finish()
    }
}

// =============================================================================
// Render host
// =============================================================================

struct RenderHost<'v> {
    vm: &'v ViewModel,
    listen: IndexSet<String>,
    report: PatchReport,
}

impl Host for RenderHost<'_> {
    fn is_component(&self, tag: &str) -> bool {
        self.vm.def.component(tag).is_some()
    }

    fn put_prop(&mut self, tag: &str, name: &str, value: &Value) -> bool {
        let Some(def) = self.vm.def.component(tag) else {
            return false;
        };
        let Some(prop) = def.prop_name(name) else {
            return false;
        };
        self.vm.pool.borrow_mut().put_prop(tag, prop, value.clone());
        true
    }

    fn mount(&mut self, tag: &str) -> Result<NodeId> {
        let vm = self.vm;
        let def = vm
            .def
            .component(tag)
            .cloned()
            .ok_or_else(|| Error::UnknownField(tag.to_string()))?;
        let child = vm.pool.borrow_mut().claim(tag, &def, |def| {
            ViewModel::child(def.clone(), vm.rt.clone(), vm.bus.clone())
        });
        let report = child.render()?;
        self.report.merge(&report);
        child.root_node().ok_or(Error::RootCount(0))
    }

    fn listen(&mut self, event_type: &str) {
        self.listen.insert(event_type.to_string());
    }

    fn subscribe(&mut self, event_type: &str, method: &str) {
        self.vm.bus.subscribe(event_type, method);
    }

    fn loop_key(&mut self, name: &str) -> String {
        let n = self.vm.loop_counter.get();
        self.vm.loop_counter.set(n + 1);
        format!("{}{}", name, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Immediate;
    use crate::config::Config;
    use crate::dom::{Dom, MemoryDom};
    use crate::types::Record;

    fn setup(def: Rc<Component>) -> (Rc<MemoryDom>, Rc<ViewModel>) {
        let dom = Rc::new(MemoryDom::new());
        let app = dom.element(dom.body(), "div", &[("id", "app")]);
        let rt = Runtime::new(dom.clone(), Config::default(), Rc::new(Immediate));
        let vm = ViewModel::root(def, rt, app);
        (dom, vm)
    }

    #[test]
    fn test_render_and_get() {
        let def = Component::builder("<p>{{Message}} {{Upper}}</p>")
            .record(Record::new().with("Message", "hi"))
            .computed("Upper", |scope| {
                let m = scope.get("Message")?;
                Ok(Value::from(m.as_str().unwrap_or_default().to_uppercase()))
            })
            .build();
        let (dom, vm) = setup(def);
        vm.render().unwrap();

        let app = dom.query_selector("#app").unwrap();
        assert_eq!(dom.inner_html(app), "<p>hi HI</p>");
        assert_eq!(vm.get("Message").unwrap(), Value::from("hi"));
        assert_eq!(vm.get("Upper").unwrap(), Value::from("HI"), "computed read from snapshot");
        assert!(matches!(vm.get("Nope"), Err(Error::UnknownField(_))));
    }

    #[test]
    fn test_loop_keys_stay_out_of_snapshot() {
        let def = Component::builder(r#"<ul><li v-for="x in Items">{{x}}</li></ul>"#)
            .record(Record::new().with("Items", vec!["a", "b"]))
            .build();
        let (_dom, vm) = setup(def);
        vm.render().unwrap();
        assert_eq!(vm.state().keys().collect::<Vec<_>>(), vec!["Items"]);
    }

    #[test]
    fn test_unknown_method_is_noop() {
        let def = Component::builder("<p></p>").build();
        let (_dom, vm) = setup(def);
        vm.render().unwrap();
        assert!(vm.call("Missing", &[]).is_ok());
    }

    #[test]
    fn test_listener_registered_once_per_type() {
        let def = Component::builder(r#"<div><a @click="A"></a><b @click="B"></b><i @keyup="C"></i></div>"#)
            .build();
        let (dom, vm) = setup(def);
        vm.render().unwrap();
        vm.render().unwrap();

        let app = dom.query_selector("#app").unwrap();
        assert_eq!(vm.listener_count(), 2);
        assert_eq!(dom.listener_count(app), 2);
    }

    #[test]
    fn test_release_detaches_listeners() {
        let def = Component::builder(r#"<button @click="A">x</button>"#).build();
        let (dom, vm) = setup(def);
        vm.render().unwrap();
        assert_eq!(dom.total_listeners(), 1);

        vm.release();
        assert_eq!(dom.total_listeners(), 0);
        assert!(vm.is_released());
        assert!(vm.render().unwrap().is_noop());
    }

    #[test]
    fn test_template_error_aborts_render() {
        let def = Component::builder(r#"<p v-bogus="x"></p>"#).build();
        let (_dom, vm) = setup(def);
        assert!(matches!(vm.render(), Err(Error::UnknownDirective(_))));
        // The guard is cleared after a failed pass.
        assert!(matches!(vm.render(), Err(Error::UnknownDirective(_))));
    }
}
