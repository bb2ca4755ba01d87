//! Error type for spark-dom.
//!
//! Every fallible engine operation returns [`Result`]. Template and data-shape
//! errors abort the current render and propagate to the caller; nothing is
//! retried.

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An attribute carries the directive prefix but names no known directive.
    #[error("unknown directive: {0}")]
    UnknownDirective(String),

    /// The executed template did not collapse to exactly one root node.
    #[error("template must have a single root element, found {0}")]
    RootCount(usize),

    /// The single root of an executed template is not an element.
    #[error("template root must be an element, found {0}")]
    RootNotElement(&'static str),

    /// A directive referenced a field that is not in the state snapshot.
    #[error("unknown data field: {0}")]
    MissingField(String),

    /// A model or raw-html directive targeted a non-string field.
    #[error("data field {field} is not a string (found {found})")]
    NotAString { field: String, found: &'static str },

    /// A loop directive targeted a value that is not a list.
    #[error("loop target {field} is not a sequence (found {found})")]
    NotASequence { field: String, found: &'static str },

    /// A loop directive value is not of the form `item in field`.
    #[error("malformed loop expression: {0:?}")]
    MalformedLoop(String),

    /// A computed read named a property that is neither state nor computed.
    #[error("unknown computed property: {0}")]
    UnknownComputed(String),

    /// A computed property depends on itself.
    #[error("computed property {0} depends on itself")]
    ComputedCycle(String),

    /// A value could not be converted to the requested type.
    #[error("expected {expected}, found {found}")]
    Coercion {
        expected: &'static str,
        found: &'static str,
    },

    /// A field registered without a setter was written.
    #[error("data field {0} is read-only")]
    ReadOnlyField(String),

    /// A read or write named a field the component does not have.
    #[error("component has no field {0}")]
    UnknownField(String),

    /// The mount selector matched nothing in the DOM.
    #[error("mount target not found: {0}")]
    MountTargetMissing(String),

    /// The data record is already borrowed (re-entrant access).
    #[error("data record is busy")]
    DataBusy,

    /// A render was requested while the same view model was rendering.
    #[error("view model {0} is already rendering")]
    RenderBusy(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
