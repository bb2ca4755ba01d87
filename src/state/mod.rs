//! State - data records, field tables, snapshots.
//!
//! - [`Fields`] / [`RecordFields`] - name-addressed access to a data record
//! - [`DataCell`] - a view model's (possibly shared) data record
//! - [`State`] - the flat per-render snapshot directives read from
//! - [`map_state`] - data + props + computed into one snapshot

mod fields;
mod mapper;
mod snapshot;

pub use fields::*;
pub use mapper::*;
pub use snapshot::*;
