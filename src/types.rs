//! Core types for spark-dom.
//!
//! These types define the values that flow through the engine: data fields,
//! props, computed properties, loop items and event arguments are all
//! [`Value`]s. Structured values are [`Record`]s, an ordered list of named
//! fields that may carry a literal output name (used by class/style binding).

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value stored in a state snapshot.
///
/// Equality is deep: two lists or records are equal when all their members
/// are equal. This is the comparison watchers are driven by.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / not yet initialized.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Get the boolean, if this is a `Bool`.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string slice, if this is a `Str`.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer, if this is an `Int`.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the items, if this is a `List`.
    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the record, if this is a `Record`.
    #[inline]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Check for `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Resolve a dotted member path (`"Author.Name"`) below this value.
    ///
    /// An empty path resolves to the value itself.
    pub fn member(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Record(record) => record.get(segment)?,
                Value::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Record(record) => {
                f.write_str("{")?;
                for (i, field) in record.fields().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", field.value)?;
                }
                f.write_str("}")
            }
        }
    }
}

// =============================================================================
// Conversions into Value
// =============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut record = Record::new();
                for (name, value) in map {
                    record.set(name, Value::from(value));
                }
                Value::Record(record)
            }
        }
    }
}

// =============================================================================
// Conversions out of Value
// =============================================================================

/// Typed extraction from a [`Value`], used by field setters.
pub trait FromValue: Sized {
    /// Convert, failing with [`Error::Coercion`] on a type mismatch.
    fn from_value(value: Value) -> Result<Self>;
}

fn coercion(expected: &'static str, value: &Value) -> Error {
    Error::Coercion {
        expected,
        found: value.type_name(),
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| coercion("bool", &value))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_int().ok_or_else(|| coercion("int", &value))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(x) => Ok(x),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(n) => Ok(n as f64),
            other => Err(coercion("float", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(coercion("string", &other)),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Record(record) => Ok(record),
            other => Err(coercion("record", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(coercion("list", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// =============================================================================
// Record
// =============================================================================

/// One named member of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Literal output name for class/style serialization.
    pub tag: Option<String>,
    pub value: Value,
}

impl Field {
    /// The name used when serializing into a class list or inline style.
    ///
    /// The tag when present, otherwise the kebab-case field name
    /// (`FontSize` -> `font-size`).
    pub fn output_name(&self) -> String {
        match &self.tag {
            Some(tag) => tag.clone(),
            None => kebab_case(&self.name),
        }
    }
}

/// An ordered record of named values.
///
/// Field order is insertion order and is preserved through serialization,
/// so class and style output is deterministic.
///
/// # Example
///
/// ```ignore
/// let classes = Record::new()
///     .tagged("Active", "active", true)
///     .tagged("TextDanger", "text-danger", false);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add or replace an untagged field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder: add or replace a field with a literal output name.
    pub fn tagged(
        mut self,
        name: impl Into<String>,
        tag: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        let field = Field {
            tag: Some(tag.into()),
            value: value.into(),
            name: name.clone(),
        };
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Set a field value, keeping its tag and position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.value = value,
            None => self.fields.push(Field {
                name,
                tag: None,
                value,
            }),
        }
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Check whether a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Iterate fields in order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Field names in order.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

/// Convert `FontSize` / `fontSize` to `font-size`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("FontSize"), "font-size");
        assert_eq!(kebab_case("Active"), "active");
        assert_eq!(kebab_case("textDanger"), "text-danger");
        assert_eq!(kebab_case("already-kebab"), "already-kebab");
        assert_eq!(kebab_case("Border2Color"), "border2-color");
    }

    #[test]
    fn test_record_set_preserves_order_and_tag() {
        let mut record = Record::new()
            .tagged("Color", "color", "red")
            .with("Size", "8px");
        record.set("Color", "blue");

        assert_eq!(record.names(), vec!["Color", "Size"]);
        let color = record.fields().next().map(|f| (f.output_name(), f.value.clone()));
        assert_eq!(color, Some(("color".to_string(), Value::from("blue"))));
    }

    #[test]
    fn test_deep_equality() {
        let a = Value::from(vec![Record::new().with("Name", "x")]);
        let b = Value::from(vec![Record::new().with("Name", "x")]);
        let c = Value::from(vec![Record::new().with("Name", "y")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_member_path() {
        let value = Value::from(
            Record::new().with("Author", Record::new().with("Name", "Ada")),
        );
        assert_eq!(value.member("Author.Name"), Some(&Value::from("Ada")));
        assert_eq!(value.member("Author.Missing"), None);
        assert_eq!(value.member(""), Some(&value));

        let list = Value::from(vec!["a", "b"]);
        assert_eq!(list.member("1"), Some(&Value::from("b")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "1,2");
    }

    #[test]
    fn test_from_value_coercion() {
        assert_eq!(String::from_value(Value::from("hi")).ok(), Some("hi".to_string()));
        assert!(matches!(
            String::from_value(Value::from(1)),
            Err(Error::Coercion { expected: "string", found: "int" })
        ));
        assert_eq!(Option::<bool>::from_value(Value::Null).ok(), Some(None));
        assert_eq!(
            Vec::<i64>::from_value(Value::from(vec![1, 2])).ok(),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({ "Title": "x", "Count": 2, "Tags": ["a"] });
        let value = Value::from(json);
        assert_eq!(value.member("Count"), Some(&Value::Int(2)));
        assert_eq!(value.member("Tags.0"), Some(&Value::from("a")));
    }
}
