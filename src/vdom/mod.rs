//! Shadow tree and reconciliation.
//!
//! Each view model keeps a [`VTree`] mirroring the live nodes it rendered.
//! A render produces a fresh executed node tree; the [`Reconciler`] walks the
//! two side by side and applies the minimal set of live operations, counted
//! in a [`PatchReport`].

mod reconcile;
mod report;
mod tree;

pub use reconcile::*;
pub use report::*;
pub use tree::*;
