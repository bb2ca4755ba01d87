//! # spark-dom
//!
//! Reactive DOM templating engine for Rust.
//!
//! A component pairs a directive-annotated HTML template with a data record.
//! Every render maps the record into a flat state snapshot, executes the
//! template against it, and reconciles the result with a persistent shadow
//! tree so the live document only receives the mutations that matter.
//!
//! ## Architecture
//!
//! ```text
//! data + props + computed → State → Executor → Node tree → Reconciler → Dom
//!                             │                     │
//!                          watchers         subcomponents (pooled)
//! ```
//!
//! ## Template syntax
//!
//! | Directive | Meaning |
//! |---|---|
//! | `v-for="item in Items"` | one clone per list item |
//! | `v-if="Seen"` | keep the node only when the field is `true` |
//! | `v-model="Text"` | two-way bind an input to a string field |
//! | `v-on:click="Method"` / `@keyup.enter="Method"` | call a method on a native event |
//! | `v-bind:href="Link"` / `:class="Classes"` | attribute (or subcomponent prop) binding |
//! | `v-html="Markup"` | inject unescaped markup |
//! | `{{Field}}` | text interpolation |
//!
//! ## Modules
//!
//! - [`types`] - Dynamic values and records
//! - [`dom`] - The live document contract and an in-memory implementation
//! - [`template`] - Parser, directives, text interpolation, executor
//! - [`state`] - Field tables, data cells, snapshots
//! - [`vdom`] - Shadow tree and reconciler
//! - [`component`] - Definitions, view models, bus, program

pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod state;
pub mod template;
pub mod types;
pub mod vdom;

// Re-export commonly used items
pub use types::*;

pub use component::{
    Bus, Caller, Component, ComponentBuilder, Context, Immediate, Method, Program, Spawner, Task,
    TaskQueue, ViewModel, Watcher,
};
pub use config::Config;
pub use dom::{Dom, Event, Listener, ListenerId, MemoryDom, Mutation, NodeId, NodeKind};
pub use error::{Error, Result};
pub use state::{map_state, ComputedFn, DataCell, FieldTable, Fields, RecordFields, Scope, State};
pub use template::{Element, Node};
pub use vdom::{Changes, PatchReport, Reconciler, VKind, VNode, VNodeId, VTree};
