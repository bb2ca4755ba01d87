//! State snapshot.
//!
//! The flat, per-render mapping of field name to value. Directives and text
//! interpolation read only from the snapshot, never from the data record, so
//! one render always sees one point in time.

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::Value;

/// Keyed state for one render pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct State {
    values: IndexMap<String, Value>,
}

/// One watched change between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: String,
    pub new: Value,
    pub old: Value,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Resolve a dotted path: the first segment is a key, the rest are
    /// members of its value (`todo3.Text`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        match path.split_once('.') {
            Some((key, rest)) => self.values.get(key)?.member(rest),
            None => self.values.get(path),
        }
    }

    /// Insert or overwrite a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys of `self` whose value differs from the one in `previous`.
    ///
    /// Keys absent from `previous` are first writes and never count as
    /// changes. Order follows `self`.
    pub fn changes_since(&self, previous: &State) -> Vec<Change> {
        self.values
            .iter()
            .filter_map(|(key, new)| {
                let old = previous.values.get(key)?;
                (old != new).then(|| Change {
                    key: key.clone(),
                    new: new.clone(),
                    old: old.clone(),
                })
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    #[test]
    fn test_lookup_dotted() {
        let mut state = State::new();
        state.insert("todo0", Value::from(Record::new().with("Text", "Learn")));
        assert_eq!(state.lookup("todo0.Text"), Some(&Value::from("Learn")));
        assert_eq!(state.lookup(" todo0 "), state.get("todo0"));
        assert_eq!(state.lookup("todo1.Text"), None);
    }

    #[test]
    fn test_changes_skip_first_write() {
        let previous: State = [("A".to_string(), Value::from(1))].into_iter().collect();
        let current: State = [
            ("A".to_string(), Value::from(2)),
            ("B".to_string(), Value::from(1)),
        ]
        .into_iter()
        .collect();

        let changes = current.changes_since(&previous);
        assert_eq!(
            changes,
            vec![Change {
                key: "A".to_string(),
                new: Value::from(2),
                old: Value::from(1),
            }],
            "B is a first write"
        );
        assert!(current.changes_since(&current).is_empty());
    }
}
