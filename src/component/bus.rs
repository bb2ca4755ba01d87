//! Event bus - per view model publish/subscribe with upward bubbling.
//!
//! `subscribe(event, method)` records interest. `publish(event, method, args)`
//! calls only `method` when it is non-empty, otherwise every method
//! subscribed to `event`. A bus with no subscription at all for `event`
//! forwards the publish unchanged to its parent; at the root the event is
//! dropped.
//!
//! Subscriptions are rebuilt on every render of the owning view model.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::error::Result;
use crate::types::Value;

/// Something that can run a named method.
pub trait Caller {
    fn call(&self, method: &str, args: &[Value]) -> Result<()>;
}

pub struct Bus {
    name: String,
    parent: Option<Rc<Bus>>,
    caller: Weak<dyn Caller>,
    subs: RefCell<IndexMap<String, IndexSet<String>>>,
}

impl Bus {
    pub fn new(name: impl Into<String>, parent: Option<Rc<Bus>>, caller: Weak<dyn Caller>) -> Self {
        Self {
            name: name.into(),
            parent,
            caller,
            subs: RefCell::new(IndexMap::new()),
        }
    }

    pub fn parent(&self) -> Option<&Rc<Bus>> {
        self.parent.as_ref()
    }

    pub fn subscribe(&self, event: &str, method: &str) {
        self.subs
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .insert(method.to_string());
    }

    pub fn is_subscribed(&self, event: &str) -> bool {
        self.subs.borrow().contains_key(event)
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.subs.borrow_mut().clear();
    }

    /// Publish `event`. Returns false if no bus in the chain had a
    /// subscriber for it.
    pub fn publish(&self, event: &str, method: &str, args: &[Value]) -> Result<bool> {
        let methods: Option<Vec<String>> = self
            .subs
            .borrow()
            .get(event)
            .map(|set| set.iter().cloned().collect());

        let Some(methods) = methods else {
            return match &self.parent {
                Some(parent) => parent.publish(event, method, args),
                None => {
                    log::debug!("{}: no subscriber for {:?}, dropped", self.name, event);
                    Ok(false)
                }
            };
        };

        let Some(caller) = self.caller.upgrade() else {
            log::warn!("{}: {:?} published after release", self.name, event);
            return Ok(false);
        };
        if method.is_empty() {
            for m in &methods {
                caller.call(m, args)?;
            }
        } else {
            caller.call(method, args)?;
        }
        Ok(true)
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.name)
            .field("subs", &self.subs.borrow())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, Vec<Value>)>>,
    }

    impl Caller for Recorder {
        fn call(&self, method: &str, args: &[Value]) -> Result<()> {
            self.calls.borrow_mut().push((method.to_string(), args.to_vec()));
            Ok(())
        }
    }

    fn bus(name: &str, parent: Option<Rc<Bus>>, recorder: &Rc<Recorder>) -> Rc<Bus> {
        let caller: Rc<dyn Caller> = recorder.clone();
        Rc::new(Bus::new(name, parent, Rc::downgrade(&caller)))
    }

    fn names(recorder: &Recorder) -> Vec<String> {
        recorder.calls.borrow().iter().map(|(m, _)| m.clone()).collect()
    }

    #[test]
    fn test_named_method_only() {
        let rec = Rc::new(Recorder::default());
        let b = bus("app", None, &rec);
        b.subscribe("click", "Toggle");
        b.subscribe("click", "Count");

        assert!(b.publish("click", "Toggle", &[]).unwrap());
        assert_eq!(names(&rec), vec!["Toggle"]);
    }

    #[test]
    fn test_empty_method_calls_all() {
        let rec = Rc::new(Recorder::default());
        let b = bus("app", None, &rec);
        b.subscribe("remove", "Remove");
        b.subscribe("remove", "Log");

        b.publish("remove", "", &[Value::from(2)]).unwrap();
        assert_eq!(names(&rec), vec!["Remove", "Log"]);
        assert_eq!(rec.calls.borrow()[0].1, vec![Value::from(2)]);
    }

    #[test]
    fn test_bubbles_two_levels() {
        let top = Rc::new(Recorder::default());
        let middle = Rc::new(Recorder::default());
        let leaf = Rc::new(Recorder::default());

        let b0 = bus("top", None, &top);
        let b1 = bus("middle", Some(b0.clone()), &middle);
        let b2 = bus("leaf", Some(b1.clone()), &leaf);
        b0.subscribe("click", "Handle");
        b1.subscribe("other", "Ignore");

        assert!(b2.publish("click", "Handle", &[]).unwrap());
        assert_eq!(names(&top), vec!["Handle"]);
        assert!(middle.calls.borrow().is_empty());
        assert!(leaf.calls.borrow().is_empty());
    }

    #[test]
    fn test_unmatched_is_silent() {
        let rec = Rc::new(Recorder::default());
        let root = bus("root", None, &rec);
        let child = bus("child", Some(root), &rec);
        assert!(!child.publish("nothing", "", &[]).unwrap());
        assert!(rec.calls.borrow().is_empty());
    }

    #[test]
    fn test_clear() {
        let rec = Rc::new(Recorder::default());
        let b = bus("app", None, &rec);
        b.subscribe("click", "A");
        b.clear();
        assert!(!b.is_subscribed("click"));
    }
}
