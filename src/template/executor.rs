//! Template executor.
//!
//! Walks a fresh copy of the parsed template depth-first, applying directives
//! against the state snapshot, and returns the concrete tree for this render.
//! Siblings are processed from a queue so a loop can replace its node with
//! the generated clones and have each clone executed in turn.
//!
//! Everything the executor needs from its view model (subcomponents, listener
//! registration, bus subscriptions, loop keys) goes through [`Host`].

use std::collections::VecDeque;

use crate::config::Config;
use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::state::State;
use crate::types::Value;

use super::directive::{self, Directive, DirectiveKind};
use super::mustache;
use super::node::{Element, Mounted, Node};
use super::parser;

// =============================================================================
// Host
// =============================================================================

/// View-model side of template execution.
pub trait Host {
    /// Is `tag` a declared subcomponent?
    fn is_component(&self, tag: &str) -> bool;

    /// Route a bound value into the pending props of the subcomponent at the
    /// current position. Returns false if `name` is not a declared prop.
    fn put_prop(&mut self, tag: &str, name: &str, value: &Value) -> bool;

    /// Render the subcomponent at the current position, returning its live root.
    fn mount(&mut self, tag: &str) -> Result<NodeId>;

    /// Request one native listener for `event_type`.
    fn listen(&mut self, event_type: &str);

    /// Subscribe `method` to `event_type` on the view model's bus.
    fn subscribe(&mut self, event_type: &str, method: &str);

    /// Next per-iteration key for loop variable `name`.
    fn loop_key(&mut self, name: &str) -> String;
}

enum Step {
    Keep(Node),
    Drop,
    Expand(Vec<Node>),
}

// =============================================================================
// Executor
// =============================================================================

pub struct Executor<'a> {
    config: &'a Config,
    state: &'a mut State,
    host: &'a mut dyn Host,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a Config, state: &'a mut State, host: &'a mut dyn Host) -> Self {
        Self {
            config,
            state,
            host,
        }
    }

    /// Execute and interpolate a whole template, which must collapse to a
    /// single root element. A subcomponent root stands in for its own
    /// mounted element.
    pub fn run(mut self, template: &[Node]) -> Result<Node> {
        let nodes = self.execute(template.to_vec())?;
        if nodes.len() != 1 {
            return Err(Error::RootCount(nodes.len()));
        }
        let mut nodes = self.interpolate(nodes);
        match nodes.pop() {
            Some(root @ (Node::Element(_) | Node::Component(_))) => Ok(root),
            Some(other) => Err(Error::RootNotElement(other.kind_name())),
            None => Err(Error::RootCount(0)),
        }
    }

    /// Execute a sibling list.
    pub fn execute(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut queue: VecDeque<Node> = nodes.into();
        let mut out = Vec::with_capacity(queue.len());
        while let Some(node) = queue.pop_front() {
            let element = match node {
                Node::Element(element) => element,
                other => {
                    out.push(other);
                    continue;
                }
            };
            match self.element(element)? {
                Step::Keep(node) => out.push(node),
                Step::Drop => {}
                Step::Expand(clones) => {
                    for clone in clones.into_iter().rev() {
                        queue.push_front(clone);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Final text pass over an executed tree.
    pub fn interpolate(&self, nodes: Vec<Node>) -> Vec<Node> {
        nodes
            .into_iter()
            .map(|node| match node {
                Node::Text(text) if mustache::has_tags(&text) => {
                    Node::Text(mustache::render(&text, &*self.state, self.config.escape_text))
                }
                Node::Element(mut el) => {
                    el.children = self.interpolate(el.children);
                    Node::Element(el)
                }
                other => other,
            })
            .collect()
    }

    fn element(&mut self, mut el: Element) -> Result<Step> {
        let (directives, plain) = directive::partition(std::mem::take(&mut el.attrs), self.config)?;
        el.attrs = plain;

        let mut pending = directives.into_iter();
        while let Some(d) = pending.next() {
            log::trace!("directive {} on <{}>", d.key, el.tag);
            match d.kind {
                DirectiveKind::For => {
                    let remaining: Vec<Directive> = pending.collect();
                    return self.expand(&el, &d, &remaining).map(Step::Expand);
                }
                DirectiveKind::If => {
                    let shown = self
                        .state
                        .lookup(&d.value)
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    if !shown {
                        return Ok(Step::Drop);
                    }
                }
                DirectiveKind::Model => self.model(&mut el, &d)?,
                DirectiveKind::On => self.on(&mut el, &d),
                DirectiveKind::Bind => self.bind(&mut el, &d)?,
                DirectiveKind::Html => {
                    let html = self.string_field(&d.value)?;
                    el.children.extend(parser::parse(&html));
                }
            }
        }

        if self.host.is_component(&el.tag) {
            let root = self.host.mount(&el.tag)?;
            return Ok(Step::Keep(Node::Component(Mounted { tag: el.tag, root })));
        }

        el.children = self.execute(std::mem::take(&mut el.children))?;
        Ok(Step::Keep(Node::Element(el)))
    }

    /// Clone `el` once per item, renaming the loop variable to a fresh key
    /// and injecting the item into state under that key.
    fn expand(&mut self, el: &Element, d: &Directive, remaining: &[Directive]) -> Result<Vec<Node>> {
        let (name, field) = directive::parse_loop(&d.value)?;
        let items = match self.state.lookup(&field) {
            None => return Err(Error::MissingField(field)),
            Some(Value::Null) => {
                log::warn!("loop over null field {}", field);
                Vec::new()
            }
            Some(Value::List(items)) => items.clone(),
            Some(other) => {
                return Err(Error::NotASequence {
                    found: other.type_name(),
                    field,
                });
            }
        };

        let mut clones = Vec::with_capacity(items.len());
        for item in items {
            let key = self.host.loop_key(&name);
            self.state.insert(key.clone(), item);

            let mut clone = Element::new(el.tag.clone());
            for r in remaining {
                clone
                    .attrs
                    .push((r.key.clone(), directive::rename_ident(&r.value, &name, &key)));
            }
            clone.attrs.extend(el.attrs.iter().cloned());
            clone.children = el
                .children
                .iter()
                .map(|child| self.rename(child.clone(), &name, &key))
                .collect();
            clones.push(Node::Element(clone));
        }
        Ok(clones)
    }

    fn rename(&self, node: Node, from: &str, to: &str) -> Node {
        match node {
            Node::Text(text) => Node::Text(mustache::rename_in_tags(&text, from, to)),
            Node::Element(mut el) => {
                for (key, value) in &mut el.attrs {
                    if let Ok(Some(_)) = directive::parse_key(key, self.config) {
                        *value = directive::rename_ident(value, from, to);
                    }
                }
                el.children = el
                    .children
                    .into_iter()
                    .map(|child| self.rename(child, from, to))
                    .collect();
                Node::Element(el)
            }
            other => other,
        }
    }

    fn model(&mut self, el: &mut Element, d: &Directive) -> Result<()> {
        let field = d.value.trim();
        let text = self.string_field(field)?;
        el.set_attr("value", text);
        el.set_attr(self.config.model_attr(), field);
        self.host.listen(&self.config.model_event);
        Ok(())
    }

    fn on(&mut self, el: &mut Element, d: &Directive) {
        let (event_type, modifiers) = d.event();
        el.set_attr(self.config.on_attr(event_type), d.value.clone());
        if !modifiers.is_empty() {
            let keys: Vec<String> = modifiers.iter().map(|m| directive::normalize_key(m)).collect();
            el.set_attr(self.config.keys_attr(event_type), keys.join(","));
        }
        // Events on a subcomponent tag are custom events from the child's bus.
        if !self.host.is_component(&el.tag) {
            self.host.listen(event_type);
        }
        self.host.subscribe(event_type, &d.value);
    }

    fn bind(&mut self, el: &mut Element, d: &Directive) -> Result<()> {
        let field = d.value.trim();
        let value = self
            .state
            .lookup(field)
            .cloned()
            .ok_or_else(|| Error::MissingField(field.to_string()))?;

        if self.host.is_component(&el.tag) && self.host.put_prop(&el.tag, &d.arg, &value) {
            return Ok(());
        }
        match (d.arg.as_str(), value) {
            ("class", value) => el.set_attr("class", format_class(&value)),
            ("style", value) => el.set_attr("style", format_style(&value)),
            (_, Value::Bool(false)) => {}
            (key, value) => el.set_attr(key, value.to_string()),
        }
        Ok(())
    }

    fn string_field(&self, field: &str) -> Result<String> {
        match self.state.lookup(field) {
            None => Err(Error::MissingField(field.to_string())),
            Some(Value::Str(text)) => Ok(text.clone()),
            Some(other) => Err(Error::NotAString {
                field: field.to_string(),
                found: other.type_name(),
            }),
        }
    }
}

// =============================================================================
// Class / style serialization
// =============================================================================

/// Serialize a class binding.
///
/// Records contribute the output name of every `true` field; lists contribute
/// their items; strings are used verbatim.
pub fn format_class(value: &Value) -> String {
    match value {
        Value::Record(record) => record
            .fields()
            .filter(|f| f.value == Value::Bool(true))
            .map(|f| f.output_name())
            .collect::<Vec<_>>()
            .join(" "),
        Value::List(items) => items
            .iter()
            .map(ToString::to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Serialize a style binding as `name: value; name: value`.
///
/// `false` and null fields are omitted.
pub fn format_style(value: &Value) -> String {
    match value {
        Value::Record(record) => record
            .fields()
            .filter(|f| !matches!(f.value, Value::Bool(false) | Value::Null))
            .map(|f| format!("{}: {}", f.output_name(), f.value))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
