//! Reactive state mapping.
//!
//! Builds one [`State`] per render from three layers:
//!
//! 1. the data record's fields, in table order
//! 2. props supplied by the parent (override or extend data entries)
//! 3. computed properties not already present, evaluated lazily through a
//!    [`Scope`] and cached for the rest of the pass
//!
//! Watcher notification is a diff between the new snapshot and the previous
//! one, see [`State::changes_since`].

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::types::Value;

use super::fields::DataCell;
use super::snapshot::State;

/// A computed property: a pure function of the other state entries.
pub type ComputedFn = Rc<dyn Fn(&Scope<'_>) -> Result<Value>>;

/// Read access to the snapshot under construction.
///
/// Reading a computed property through the scope evaluates it on first use
/// and caches the result.
pub struct Scope<'a> {
    values: RefCell<State>,
    computed: &'a IndexMap<String, ComputedFn>,
    data: &'a DataCell,
    active: RefCell<Vec<String>>,
}

impl<'a> Scope<'a> {
    fn new(values: State, computed: &'a IndexMap<String, ComputedFn>, data: &'a DataCell) -> Self {
        Self {
            values: RefCell::new(values),
            computed,
            data,
            active: RefCell::new(Vec::new()),
        }
    }

    /// Value of a state entry, evaluating a computed property if needed.
    pub fn get(&self, name: &str) -> Result<Value> {
        let cached = self.values.borrow().get(name).cloned();
        if let Some(value) = cached {
            return Ok(value);
        }
        let compute = self
            .computed
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownComputed(name.to_string()))?;

        if self.active.borrow().iter().any(|n| n == name) {
            return Err(Error::ComputedCycle(name.to_string()));
        }
        self.active.borrow_mut().push(name.to_string());
        let result = compute(self);
        self.active.borrow_mut().pop();

        let value = result?;
        log::trace!("computed {} = {:?}", name, value);
        self.values.borrow_mut().insert(name, value.clone());
        Ok(value)
    }

    /// Typed read access to the data record.
    pub fn data<D: 'static, R>(&self, f: impl FnOnce(&D) -> R) -> Result<R> {
        self.data.with(f)
    }

    fn finish(self) -> State {
        self.values.into_inner()
    }
}

/// Map data, props and computed properties into one snapshot.
pub fn map_state(
    data: &DataCell,
    props: &IndexMap<String, Value>,
    computed: &IndexMap<String, ComputedFn>,
) -> Result<State> {
    let mut state: State = data.snapshot()?.into_iter().collect();
    for (name, value) in props {
        state.insert(name.clone(), value.clone());
    }

    let scope = Scope::new(state, computed, data);
    for name in computed.keys() {
        scope.get(name)?;
    }
    Ok(scope.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RecordFields;
    use crate::types::Record;
    use std::cell::Cell;

    fn cell() -> DataCell {
        DataCell::new(
            Record::new().with("Message", "Hello").with("Count", 2),
            Rc::new(RecordFields),
        )
    }

    fn computed_fn(f: impl Fn(&Scope<'_>) -> Result<Value> + 'static) -> ComputedFn {
        Rc::new(f)
    }

    fn computed(pairs: Vec<(&str, ComputedFn)>) -> IndexMap<String, ComputedFn> {
        pairs.into_iter().map(|(n, f)| (n.to_string(), f)).collect()
    }

    #[test]
    fn test_layers_in_order() {
        let mut props = IndexMap::new();
        props.insert("Count".to_string(), Value::from(5));
        props.insert("Title".to_string(), Value::from("t"));

        let table = computed(vec![(
            "Reversed",
            computed_fn(|scope: &Scope<'_>| {
                let message = scope.get("Message")?;
                Ok(Value::from(
                    message.as_str().unwrap_or_default().chars().rev().collect::<String>(),
                ))
            }),
        )]);

        let state = map_state(&cell(), &props, &table).unwrap();
        assert_eq!(
            state.keys().collect::<Vec<_>>(),
            vec!["Message", "Count", "Title", "Reversed"]
        );
        assert_eq!(state.get("Count"), Some(&Value::from(5)), "props override data");
        assert_eq!(state.get("Reversed"), Some(&Value::from("olleH")));
    }

    #[test]
    fn test_computed_evaluated_once() {
        let calls = Rc::new(Cell::new(0));
        let counted = calls.clone();
        let table = computed(vec![
            (
                "Double",
                computed_fn(move |scope: &Scope<'_>| {
                    counted.set(counted.get() + 1);
                    let n = scope.get("Count")?.as_int().unwrap_or_default();
                    Ok(Value::from(n * 2))
                }),
            ),
            (
                "Quad",
                computed_fn(|scope: &Scope<'_>| {
                    let n = scope.get("Double")?.as_int().unwrap_or_default();
                    Ok(Value::from(n * 2))
                }),
            ),
        ]);

        let state = map_state(&cell(), &IndexMap::new(), &table).unwrap();
        assert_eq!(state.get("Quad"), Some(&Value::from(8)));
        assert_eq!(calls.get(), 1, "Double cached after first read");
    }

    #[test]
    fn test_data_shadows_computed() {
        let table = computed(vec![(
            "Message",
            computed_fn(|_: &Scope<'_>| Ok(Value::from("computed"))),
        )]);
        let state = map_state(&cell(), &IndexMap::new(), &table).unwrap();
        assert_eq!(state.get("Message"), Some(&Value::from("Hello")));
    }

    #[test]
    fn test_unknown_and_cyclic_computed() {
        let table = computed(vec![(
            "Broken",
            computed_fn(|scope: &Scope<'_>| scope.get("Nowhere")),
        )]);
        assert!(matches!(
            map_state(&cell(), &IndexMap::new(), &table),
            Err(Error::UnknownComputed(name)) if name == "Nowhere"
        ));

        let table = computed(vec![
            ("A", computed_fn(|scope: &Scope<'_>| scope.get("B"))),
            ("B", computed_fn(|scope: &Scope<'_>| scope.get("A"))),
        ]);
        assert!(matches!(
            map_state(&cell(), &IndexMap::new(), &table),
            Err(Error::ComputedCycle(_))
        ));
    }
}
