//! Components - definitions, live instances, and the program that hosts them.
//!
//! | Type | Role |
//! |---|---|
//! | [`Component`] | Immutable definition: template, data, methods, computed, watchers, props, nested components |
//! | [`ViewModel`] | One live instance: data record, snapshot, listeners, bus, subcomponent pool, shadow tree |
//! | [`Context`] | What methods and watchers see |
//! | [`Bus`] | Custom events, bubbling to the parent instance |
//! | [`Program`] | Root instance mounted into a [`Dom`](crate::dom::Dom) |
//! | [`Spawner`] | Host scheduling for `go` calls ([`Immediate`], [`TaskQueue`]) |
//!
//! Subcomponents are pooled per parent by (tag, occurrence index) and
//! released when a parent render no longer reaches them.

mod bus;
mod context;
mod definition;
mod pool;
mod program;
mod runtime;
mod view_model;

pub use bus::*;
pub use context::*;
pub use definition::*;
pub use program::*;
pub use runtime::{Immediate, Spawner, Task, TaskQueue};
pub use view_model::*;
