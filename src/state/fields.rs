//! Field descriptor tables and the data cell.
//!
//! A component's data record is an arbitrary Rust value. Templates address
//! it by field name, so each definition carries a table mapping names to
//! typed get/set closures, built once at definition time:
//!
//! ```ignore
//! struct App { message: String, seen: bool }
//!
//! let fields = Fields::new()
//!     .field("Message", |d: &App| d.message.clone(), |d: &mut App, v| d.message = v)
//!     .readonly("Seen", |d: &App| d.seen);
//! ```
//!
//! A plain [`Record`] works as a data record too, through [`RecordFields`].

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::types::{FromValue, Record, Value};

// =============================================================================
// FieldTable
// =============================================================================

/// Name-addressed access to a type-erased data record.
pub trait FieldTable {
    /// Field names, in declaration order.
    fn names(&self, data: &dyn Any) -> Result<Vec<String>>;

    fn get(&self, data: &dyn Any, name: &str) -> Result<Value>;

    fn set(&self, data: &mut dyn Any, name: &str, value: Value) -> Result<()>;
}

fn wrong_record<D>() -> Error {
    Error::Coercion {
        expected: type_name::<D>(),
        found: "another data record type",
    }
}

// =============================================================================
// Fields<D>
// =============================================================================

type Getter<D> = Box<dyn Fn(&D) -> Value>;
type Setter<D> = Box<dyn Fn(&mut D, Value) -> Result<()>>;

struct Entry<D> {
    name: String,
    get: Getter<D>,
    set: Option<Setter<D>>,
}

/// Typed field table for data records of type `D`.
pub struct Fields<D> {
    entries: Vec<Entry<D>>,
}

impl<D> Default for Fields<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D: 'static> Fields<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a read/write field.
    ///
    /// Writes are converted with [`FromValue`]; a mismatched value fails with
    /// [`Error::Coercion`] and leaves the record untouched.
    pub fn field<T, G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        T: Into<Value> + FromValue,
        G: Fn(&D) -> T + 'static,
        S: Fn(&mut D, T) + 'static,
    {
        self.entries.push(Entry {
            name: name.into(),
            get: Box::new(move |d: &D| -> Value { get(d).into() }),
            set: Some(Box::new(move |d: &mut D, value: Value| -> Result<()> {
                set(d, T::from_value(value)?);
                Ok(())
            })),
        });
        self
    }

    /// Register a field without a setter; writes fail with
    /// [`Error::ReadOnlyField`].
    pub fn readonly<T, G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        T: Into<Value>,
        G: Fn(&D) -> T + 'static,
    {
        self.entries.push(Entry {
            name: name.into(),
            get: Box::new(move |d: &D| -> Value { get(d).into() }),
            set: None,
        });
        self
    }

    fn entry(&self, name: &str) -> Result<&Entry<D>> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }
}

impl<D: 'static> FieldTable for Fields<D> {
    fn names(&self, _data: &dyn Any) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.name.clone()).collect())
    }

    fn get(&self, data: &dyn Any, name: &str) -> Result<Value> {
        let entry = self.entry(name)?;
        let data = data.downcast_ref::<D>().ok_or_else(wrong_record::<D>)?;
        Ok((entry.get)(data))
    }

    fn set(&self, data: &mut dyn Any, name: &str, value: Value) -> Result<()> {
        let entry = self.entry(name)?;
        let set = entry
            .set
            .as_ref()
            .ok_or_else(|| Error::ReadOnlyField(name.to_string()))?;
        let data = data.downcast_mut::<D>().ok_or_else(wrong_record::<D>)?;
        set(data, value)
    }
}

/// Field table for a [`Record`] used directly as the data record.
///
/// Writes may replace a field's value with any type but may not add fields.
pub struct RecordFields;

impl FieldTable for RecordFields {
    fn names(&self, data: &dyn Any) -> Result<Vec<String>> {
        let record = data.downcast_ref::<Record>().ok_or_else(wrong_record::<Record>)?;
        Ok(record.names())
    }

    fn get(&self, data: &dyn Any, name: &str) -> Result<Value> {
        let record = data.downcast_ref::<Record>().ok_or_else(wrong_record::<Record>)?;
        record
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    fn set(&self, data: &mut dyn Any, name: &str, value: Value) -> Result<()> {
        let record = data.downcast_mut::<Record>().ok_or_else(wrong_record::<Record>)?;
        if !record.contains(name) {
            return Err(Error::UnknownField(name.to_string()));
        }
        record.set(name, value);
        Ok(())
    }
}

// =============================================================================
// DataCell
// =============================================================================

/// A view model's data record together with its field table.
///
/// Cloning the cell shares the record (used for shared data).
#[derive(Clone)]
pub struct DataCell {
    data: Rc<RefCell<Box<dyn Any>>>,
    fields: Rc<dyn FieldTable>,
}

impl DataCell {
    pub fn new<D: 'static>(data: D, fields: Rc<dyn FieldTable>) -> Self {
        Self::from_parts(Rc::new(RefCell::new(Box::new(data))), fields)
    }

    pub(crate) fn from_parts(data: Rc<RefCell<Box<dyn Any>>>, fields: Rc<dyn FieldTable>) -> Self {
        Self { data, fields }
    }

    /// Check whether two cells share one record.
    pub fn shares(&self, other: &DataCell) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let data = self.data.try_borrow().map_err(|_| Error::DataBusy)?;
        self.fields.names(&**data)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        let data = self.data.try_borrow().map_err(|_| Error::DataBusy)?;
        self.fields.get(&**data, name)
    }

    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let mut data = self.data.try_borrow_mut().map_err(|_| Error::DataBusy)?;
        self.fields.set(&mut **data, name, value)
    }

    /// Every field, in table order.
    pub fn snapshot(&self) -> Result<Vec<(String, Value)>> {
        let data = self.data.try_borrow().map_err(|_| Error::DataBusy)?;
        let names = self.fields.names(&**data)?;
        names
            .into_iter()
            .map(|name| {
                let value = self.fields.get(&**data, &name)?;
                Ok((name, value))
            })
            .collect()
    }

    /// Typed read access.
    pub fn with<D: 'static, R>(&self, f: impl FnOnce(&D) -> R) -> Result<R> {
        let data = self.data.try_borrow().map_err(|_| Error::DataBusy)?;
        let data = data.downcast_ref::<D>().ok_or_else(wrong_record::<D>)?;
        Ok(f(data))
    }

    /// Typed write access.
    pub fn with_mut<D: 'static, R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R> {
        let mut data = self.data.try_borrow_mut().map_err(|_| Error::DataBusy)?;
        let data = data.downcast_mut::<D>().ok_or_else(wrong_record::<D>)?;
        Ok(f(data))
    }
}

impl std::fmt::Debug for DataCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCell")
            .field("names", &self.names().unwrap_or_default())
            .finish()
    }
}
