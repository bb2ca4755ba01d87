//! Program runtime - shared handles and deferred effects.
//!
//! Every view model of one program holds the same [`Runtime`]: the DOM
//! provider, the config, the task spawner, and a queue of effects requested
//! from inside methods and watchers.
//!
//! Effects never run on the stack that requested them. The outermost engine
//! entry point (a program call, a DOM listener, a spawned task) drains the
//! queue once its own work is finished, so a view model is never re-entered
//! while it is running a method or rendering.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::config::Config;
use crate::dom::Dom;
use crate::error::{Error, Result};
use crate::types::Value;

use super::bus::Bus;
use super::view_model::ViewModel;

// =============================================================================
// Spawner
// =============================================================================

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Host scheduling hook for `go` method calls.
///
/// The engine never creates concurrency itself; it hands tasks to the
/// spawner and the host decides when they run.
pub trait Spawner {
    fn spawn(&self, task: Task);
}

/// Runs each task as soon as it is submitted.
///
/// Submission happens while effects are drained, so the task still runs after
/// the method that requested it has finished.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Spawner for Immediate {
    fn spawn(&self, task: Task) {
        task();
    }
}

/// A FIFO of tasks the host drains explicitly.
///
/// # Example
///
/// ```ignore
/// let queue = Rc::new(TaskQueue::new());
/// let program = Program::mount_with(dom, "#app", &app, Config::default(), queue.clone())?;
/// program.call("Load", vec![])?;   // method calls ctx.go("Fetch", ..)
/// queue.run_until_idle();          // Fetch runs here
/// ```
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run queued tasks, including ones queued while running, until empty.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Spawner for TaskQueue {
    fn spawn(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

// =============================================================================
// Effects
// =============================================================================

pub(crate) enum Effect {
    /// Publish to every subscriber of `event`, bubbling from `bus`.
    Emit {
        bus: Rc<Bus>,
        event: String,
        args: Vec<Value>,
    },
    /// Call a method (and re-render) on a view model.
    Call {
        vm: Weak<ViewModel>,
        method: String,
        args: Vec<Value>,
    },
    /// Hand a method call to the spawner.
    Go {
        vm: Weak<ViewModel>,
        method: String,
        args: Vec<Value>,
    },
}

// =============================================================================
// Runtime
// =============================================================================

pub(crate) struct Runtime {
    pub(crate) dom: Rc<dyn Dom>,
    pub(crate) config: Config,
    spawner: Rc<dyn Spawner>,
    pending: RefCell<VecDeque<Effect>>,
    depth: Cell<usize>,
    fault: RefCell<Option<Error>>,
    this: Weak<Runtime>,
}

impl Runtime {
    pub(crate) fn new(dom: Rc<dyn Dom>, config: Config, spawner: Rc<dyn Spawner>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            dom,
            config,
            spawner,
            pending: RefCell::new(VecDeque::new()),
            depth: Cell::new(0),
            fault: RefCell::new(None),
            this: this.clone(),
        })
    }

    pub(crate) fn defer(&self, effect: Effect) {
        self.pending.borrow_mut().push_back(effect);
    }

    /// Run `f` as an engine entry point. The outermost call drains the
    /// effect queue after `f` succeeds; a failure discards queued effects.
    pub(crate) fn run<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        self.depth.set(self.depth.get() + 1);
        let result = f();
        self.depth.set(self.depth.get() - 1);
        if self.depth.get() > 0 {
            return result;
        }
        match result {
            Ok(value) => {
                self.drain()?;
                Ok(value)
            }
            Err(err) => {
                self.pending.borrow_mut().clear();
                Err(err)
            }
        }
    }

    fn drain(&self) -> Result<()> {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(effect) = next else {
                return Ok(());
            };
            self.depth.set(self.depth.get() + 1);
            let result = self.apply(effect);
            self.depth.set(self.depth.get() - 1);
            if let Err(err) = result {
                self.pending.borrow_mut().clear();
                return Err(err);
            }
        }
    }

    fn apply(&self, effect: Effect) -> Result<()> {
        match effect {
            Effect::Emit { bus, event, args } => {
                bus.publish(&event, "", &args)?;
            }
            Effect::Call { vm, method, args } => match vm.upgrade() {
                Some(vm) => vm.call(&method, &args)?,
                None => log::warn!("call {} on a dropped view model", method),
            },
            Effect::Go { vm, method, args } => {
                let rt = self.this.clone();
                log::debug!("spawning {}", method);
                self.spawner.spawn(Box::new(move || {
                    let (Some(rt), Some(vm)) = (rt.upgrade(), vm.upgrade()) else {
                        log::warn!("spawned {} outlived its program", method);
                        return;
                    };
                    if let Err(err) = vm.call(&method, &args) {
                        rt.report(err);
                    }
                }));
            }
        }
        Ok(())
    }

    /// Record an error that has no caller to return to.
    pub(crate) fn report(&self, err: Error) {
        log::error!("{}", err);
        *self.fault.borrow_mut() = Some(err);
    }

    pub(crate) fn take_fault(&self) -> Option<Error> {
        self.fault.borrow_mut().take()
    }
}
