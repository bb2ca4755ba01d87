//! Templates - parsing, directives, execution.
//!
//! A component's template text is parsed once into a [`Node`] forest. Each
//! render clones that forest and runs it through the [`Executor`], which
//! resolves directives against the state snapshot:
//!
//! | Directive | Effect |
//! |---|---|
//! | `v-for="item in Field"` | one clone per item, `item` renamed per clone |
//! | `v-if="Field"` | node dropped unless the field is `true` |
//! | `v-model="Field"` | `value` attribute + input listener |
//! | `v-on:type.keys` / `@type` | handler attribute + listener + bus subscription |
//! | `v-bind:attr` / `:attr` | attribute, class/style serialization, or subcomponent prop |
//! | `v-html="Field"` | field parsed and appended as children |
//!
//! Text interpolation runs last, over the finished structure.

mod directive;
mod executor;
mod mustache;
mod node;
mod parser;

pub use directive::{
    key_matches, normalize_key, parse_key, parse_loop, partition, rename_ident, Directive,
    DirectiveKind,
};
pub use executor::{format_class, format_style, Executor, Host};
pub use mustache::{has_tags, render, rename_in_tags};
pub use node::{Element, Mounted, Node};
pub use parser::parse;
