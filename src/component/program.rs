//! Program - a root component mounted into a live document.
//!
//! # Example
//!
//! ```ignore
//! let dom = Rc::new(MemoryDom::new());
//! dom.element(dom.body(), "div", &[("id", "app")]);
//!
//! let program = Program::mount(dom.clone(), "#app", &app)?;
//! program.set("Message", "hello")?;
//! program.render()?;
//! program.call("Reverse", vec![])?;   // method, then render
//!
//! program.unmount();
//! ```

use std::rc::Rc;

use crate::config::Config;
use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::types::Value;
use crate::vdom::PatchReport;

use super::definition::Component;
use super::runtime::{Immediate, Runtime, Spawner};
use super::view_model::ViewModel;

pub struct Program {
    vm: Rc<ViewModel>,
    rt: Rc<Runtime>,
}

impl Program {
    /// Mount with the default config and inline task execution.
    pub fn mount(dom: Rc<dyn Dom>, selector: &str, component: &Rc<Component>) -> Result<Self> {
        Self::mount_with(dom, selector, component, Config::default(), Rc::new(Immediate))
    }

    /// Mount `component` into the element matching `selector` and render it.
    ///
    /// The first render diffs against whatever the element already contains.
    pub fn mount_with(
        dom: Rc<dyn Dom>,
        selector: &str,
        component: &Rc<Component>,
        config: Config,
        spawner: Rc<dyn Spawner>,
    ) -> Result<Self> {
        let container = dom
            .query_selector(selector)
            .ok_or_else(|| Error::MountTargetMissing(selector.to_string()))?;
        let rt = Runtime::new(dom, config, spawner);
        let vm = ViewModel::root(component.clone(), rt.clone(), container);
        let program = Self { vm, rt };
        let report = program.render()?;
        log::debug!(
            "mounted {} at {} ({} live ops)",
            component.name(),
            selector,
            report.total()
        );
        Ok(program)
    }

    pub fn render(&self) -> Result<PatchReport> {
        self.vm.render()
    }

    /// Run a method on the root view model, then re-render.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<()> {
        self.vm.call(method, &args)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.vm.get(name)
    }

    /// Write a data field. Call [`Program::render`] to show it.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.vm.set(name, value.into())
    }

    pub fn view_model(&self) -> &Rc<ViewModel> {
        &self.vm
    }

    /// Live root element.
    pub fn root(&self) -> Option<NodeId> {
        self.vm.root_node()
    }

    /// Last error raised inside a listener or a spawned task.
    pub fn take_fault(&self) -> Option<Error> {
        self.rt.take_fault()
    }

    /// Detach every listener, recursively. The rendered nodes stay in place.
    pub fn unmount(self) {
        log::debug!("unmounting {}", self.vm.name());
        self.vm.release();
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program").field("root", &self.vm).finish()
    }
}
