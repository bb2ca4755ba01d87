//! Method and watcher context.

use crate::error::Result;
use crate::types::Value;

use super::runtime::Effect;
use super::view_model::ViewModel;

/// What a method or watcher sees of its view model.
///
/// Reads and writes go straight to the data record. `emit`, `call` and `go`
/// are deferred until the current engine entry point has finished.
pub struct Context<'a> {
    vm: &'a ViewModel,
    args: &'a [Value],
}

impl<'a> Context<'a> {
    pub(crate) fn new(vm: &'a ViewModel, args: &'a [Value]) -> Self {
        Self { vm, args }
    }

    /// Current value of a data field, prop or computed property.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.vm.get(name)
    }

    /// Write a data field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.vm.set(name, value.into())
    }

    /// Typed mutable access to the data record.
    pub fn update<D: 'static, R>(&mut self, f: impl FnOnce(&mut D) -> R) -> Result<R> {
        self.vm.data().with_mut(f)
    }

    /// Typed read access to the data record.
    pub fn data<D: 'static, R>(&self, f: impl FnOnce(&D) -> R) -> Result<R> {
        self.vm.data().with(f)
    }

    pub fn args(&self) -> &[Value] {
        self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Current value of a prop supplied by the parent.
    pub fn prop(&self, name: &str) -> Option<Value> {
        self.vm.prop(name)
    }

    /// Publish `event` to every subscriber, starting at this view model's
    /// bus and bubbling upward.
    pub fn emit(&mut self, event: impl Into<String>, args: Vec<Value>) {
        self.vm.runtime().defer(Effect::Emit {
            bus: self.vm.bus().clone(),
            event: event.into(),
            args,
        });
    }

    /// Call another method of this view model afterwards.
    pub fn call(&mut self, method: impl Into<String>, args: Vec<Value>) {
        self.vm.runtime().defer(Effect::Call {
            vm: self.vm.downgrade(),
            method: method.into(),
            args,
        });
    }

    /// Hand a method call to the program's spawner.
    pub fn go(&mut self, method: impl Into<String>, args: Vec<Value>) {
        self.vm.runtime().defer(Effect::Go {
            vm: self.vm.downgrade(),
            method: method.into(),
            args,
        });
    }
}
