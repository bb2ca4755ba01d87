//! Component definitions and their builder.
//!
//! A [`Component`] is immutable once built and shared as `Rc<Component>` by
//! every view model rendering it.
//!
//! ```ignore
//! struct Todo { text: String, done: bool }
//!
//! let item = Component::builder(r#"<li :class="Classes" @click="Toggle">{{Text}}</li>"#)
//!     .name("item")
//!     .props(&["Text"])
//!     .data(|| Todo { text: String::new(), done: false },
//!           Fields::new().field("Done", |t: &Todo| t.done, |t: &mut Todo, v| t.done = v))
//!     .method("Toggle", |ctx| ctx.update(|t: &mut Todo| t.done = !t.done))
//!     .build();
//! ```

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::state::{ComputedFn, DataCell, Fields, RecordFields, Scope};
use crate::template::{self, Node};
use crate::types::{Record, Value};

use super::context::Context;

/// A method: reads and writes state through the context.
pub type Method = Rc<dyn Fn(&mut Context<'_>) -> Result<()>>;

/// A watcher: called with `(new, old)` when its field changes between renders.
pub type Watcher = Rc<dyn Fn(&mut Context<'_>, &Value, &Value) -> Result<()>>;

enum DataSource {
    Fresh(Rc<dyn Fn() -> DataCell>),
    Shared(DataCell),
}

// =============================================================================
// Component
// =============================================================================

pub struct Component {
    name: String,
    source: String,
    template: Vec<Node>,
    data: DataSource,
    pub(crate) methods: IndexMap<String, Method>,
    pub(crate) computed: IndexMap<String, ComputedFn>,
    pub(crate) watchers: IndexMap<String, Watcher>,
    props: Vec<String>,
    components: IndexMap<String, Rc<Component>>,
}

impl Component {
    pub fn builder(template: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(template.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template text as given to the builder.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed template, executed fresh on every render.
    pub fn template(&self) -> &[Node] {
        &self.template
    }

    pub fn props(&self) -> &[String] {
        &self.props
    }

    /// Declared prop matching `name`, ignoring ASCII case.
    pub fn prop_name(&self, name: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|p| p.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Nested definition registered under `tag`.
    pub fn component(&self, tag: &str) -> Option<&Rc<Component>> {
        self.components.get(&tag.to_ascii_lowercase())
    }

    /// Data record for a new instance.
    pub(crate) fn instantiate_data(&self) -> DataCell {
        match &self.data {
            DataSource::Fresh(factory) => factory(),
            DataSource::Shared(cell) => cell.clone(),
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("watchers", &self.watchers.keys().collect::<Vec<_>>())
            .field("props", &self.props)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct ComponentBuilder {
    name: String,
    source: String,
    data: DataSource,
    methods: IndexMap<String, Method>,
    computed: IndexMap<String, ComputedFn>,
    watchers: IndexMap<String, Watcher>,
    props: Vec<String>,
    components: IndexMap<String, Rc<Component>>,
}

impl ComponentBuilder {
    fn new(source: String) -> Self {
        Self {
            name: "component".to_string(),
            source,
            data: DataSource::Fresh(Rc::new(|| DataCell::new(Record::new(), Rc::new(RecordFields)))),
            methods: IndexMap::new(),
            computed: IndexMap::new(),
            watchers: IndexMap::new(),
            props: Vec::new(),
            components: IndexMap::new(),
        }
    }

    /// Name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fresh data record per instance, built by `factory`.
    pub fn data<D: 'static>(mut self, factory: impl Fn() -> D + 'static, fields: Fields<D>) -> Self {
        let fields: Rc<Fields<D>> = Rc::new(fields);
        self.data = DataSource::Fresh(Rc::new(move || DataCell::new(factory(), fields.clone())));
        self
    }

    /// One data record shared by every instance.
    pub fn shared<D: 'static>(mut self, value: D, fields: Fields<D>) -> Self {
        self.data = DataSource::Shared(DataCell::new(value, Rc::new(fields)));
        self
    }

    /// Fresh copy of a dynamic record per instance.
    pub fn record(mut self, record: Record) -> Self {
        self.data = DataSource::Fresh(Rc::new(move || DataCell::new(record.clone(), Rc::new(RecordFields))));
        self
    }

    /// One dynamic record shared by every instance.
    pub fn shared_record(mut self, record: Record) -> Self {
        self.data = DataSource::Shared(DataCell::new(record, Rc::new(RecordFields)));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&mut Context<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn computed(
        mut self,
        name: impl Into<String>,
        computed: impl Fn(&Scope<'_>) -> Result<Value> + 'static,
    ) -> Self {
        self.computed.insert(name.into(), Rc::new(computed));
        self
    }

    pub fn watch(
        mut self,
        field: impl Into<String>,
        watcher: impl Fn(&mut Context<'_>, &Value, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.watchers.insert(field.into(), Rc::new(watcher));
        self
    }

    pub fn prop(mut self, name: impl Into<String>) -> Self {
        self.props.push(name.into());
        self
    }

    pub fn props(mut self, names: &[&str]) -> Self {
        self.props.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Register a nested component under a (case-insensitive) tag name.
    pub fn component(mut self, tag: &str, component: Rc<Component>) -> Self {
        self.components.insert(tag.to_ascii_lowercase(), component);
        self
    }

    pub fn build(self) -> Rc<Component> {
        let template = template::parse(&self.source);
        log::debug!("built component {} ({} top-level nodes)", self.name, template.len());
        Rc::new(Component {
            name: self.name,
            source: self.source,
            template,
            data: self.data,
            methods: self.methods,
            computed: self.computed,
            watchers: self.watchers,
            props: self.props,
            components: self.components,
        })
    }
}
