//! Subcomponent instance pool.
//!
//! Instances are keyed by (tag, occurrence index within one parent render).
//! Each parent render resets every index to zero; each occurrence of a tag
//! claims the next index, reusing the instance there or creating one. After
//! the render, instances past the last claimed index are released.
//!
//! Identity is positional: reordering a loop's items reattaches instances by
//! position, not by item.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::types::Value;

use super::definition::Component;
use super::view_model::ViewModel;

struct Instance {
    /// Props bound during the current parent render, merged on claim.
    pending: IndexMap<String, Value>,
    vm: Option<Rc<ViewModel>>,
}

impl Instance {
    fn empty() -> Self {
        Self {
            pending: IndexMap::new(),
            vm: None,
        }
    }
}

#[derive(Default)]
struct Slot {
    index: usize,
    instances: Vec<Instance>,
}

impl Slot {
    fn current(&mut self) -> &mut Instance {
        while self.instances.len() <= self.index {
            self.instances.push(Instance::empty());
        }
        let index = self.index;
        &mut self.instances[index]
    }
}

#[derive(Default)]
pub(crate) struct Pool {
    slots: IndexMap<String, Slot>,
}

impl Pool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start a parent render.
    pub(crate) fn begin(&mut self) {
        for slot in self.slots.values_mut() {
            slot.index = 0;
            for instance in &mut slot.instances {
                instance.pending.clear();
            }
        }
    }

    /// Record a prop for the occurrence of `tag` about to be claimed.
    pub(crate) fn put_prop(&mut self, tag: &str, name: &str, value: Value) {
        self.slots
            .entry(tag.to_string())
            .or_default()
            .current()
            .pending
            .insert(name.to_string(), value);
    }

    /// Claim the next occurrence of `tag`, creating its view model with
    /// `create` if this position is new. Pending props are merged into the
    /// instance before it is returned.
    pub(crate) fn claim(
        &mut self,
        tag: &str,
        def: &Rc<Component>,
        create: impl FnOnce(&Rc<Component>) -> Rc<ViewModel>,
    ) -> Rc<ViewModel> {
        let slot = self.slots.entry(tag.to_string()).or_default();
        let index = slot.index;
        let instance = slot.current();
        let vm = match instance.vm.clone() {
            Some(vm) => vm,
            None => {
                log::debug!("pool: new <{}> at {}", tag, index);
                let vm = create(def);
                instance.vm = Some(vm.clone());
                vm
            }
        };
        vm.merge_props(std::mem::take(&mut instance.pending));
        slot.index += 1;
        vm
    }

    /// Release every instance not claimed since [`Pool::begin`].
    pub(crate) fn end(&mut self) -> usize {
        let mut released = 0;
        for (tag, slot) in &mut self.slots {
            for instance in slot.instances.drain(slot.index..) {
                if let Some(vm) = instance.vm {
                    log::debug!("pool: releasing <{}>", tag);
                    vm.release();
                    released += 1;
                }
            }
        }
        self.slots.retain(|_, slot| !slot.instances.is_empty());
        released
    }

    /// Release everything.
    pub(crate) fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            slot.index = 0;
        }
        self.end();
    }

    /// Live instances, in tag then position order.
    pub(crate) fn instances(&self) -> Vec<Rc<ViewModel>> {
        self.slots
            .values()
            .flat_map(|slot| slot.instances.iter().filter_map(|i| i.vm.clone()))
            .collect()
    }
}
