//! Cooperative task scheduling.
//!
//! Every subsystem that needs to run once per control period implements
//! [`CoopTask`] and is registered with a [`TaskManager`] together with the
//! set of callbacks it wants ([`TaskFlags`]). The competition loop then drives
//! the manager in strict phases:
//!
//! 1. [`process_all_inputs`](TaskManager::process_all_inputs), in registration order.
//! 2. The mode-specific periodic logic (autonomous state machine or teleop).
//! 3. [`process_all_actions`](TaskManager::process_all_actions), in **reverse**
//!    registration order.
//!
//! Init and start run forward; stop runs in reverse, so a subsystem that was
//! registered after the drive base (a line follower, say) stops issuing
//! commands before the drive base itself is stopped.
//!
//! # Example
//!
//! ```ignore
//! use oceanus::{make_cloneable, task::{TaskFlags, TaskManager}};
//!
//! let mut tasks = TaskManager::new();
//! let lift = make_cloneable(lift);
//! tasks.register(lift.clone(), TaskFlags::STOP | TaskFlags::ACTION);
//! ```

use std::{cell::RefCell, fmt, rc::Rc};

use bitflags::bitflags;
use log::{trace, warn};

bitflags! {
    /// The callbacks a registered task subscribes to.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TaskFlags: u32 {
        /// One-time initialization after the robot is constructed.
        const INIT   = 0x0000_0001;
        /// Called when the robot becomes enabled in any mode.
        const START  = 0x0000_0002;
        /// Called when the robot leaves an enabled mode.
        const STOP   = 0x0000_0004;
        /// Called every period before the mode logic runs.
        const INPUT  = 0x0000_0008;
        /// Called every period after the mode logic runs.
        const ACTION = 0x0000_0010;
    }
}

/// The competition mode a callback is being run for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RunMode {
    #[default]
    Disabled,
    Autonomous,
    TeleOp,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Disabled => "DISABLED",
            RunMode::Autonomous => "AUTONOMOUS",
            RunMode::TeleOp => "TELEOP",
        };
        f.write_str(name)
    }
}

/// A component driven by the [`TaskManager`].
///
/// All callbacks default to doing nothing; implement the ones matching the
/// flags the task is registered with. Callbacks must return promptly: the
/// whole period shares one thread.
pub trait CoopTask {
    /// Called once at robot init.
    fn init_task(&mut self) {}

    /// Called when `mode` is entered.
    fn start_task(&mut self, _mode: RunMode) {}

    /// Called when `mode` is left. Outputs should go neutral here.
    fn stop_task(&mut self, _mode: RunMode) {}

    /// Reads sensors, at the start of every period.
    fn process_input(&mut self, _mode: RunMode) {}

    /// Sends outputs, at the end of every period.
    fn process_action(&mut self, _mode: RunMode) {}
}

/// Shared handle to a registered task.
pub type TaskHandle = Rc<RefCell<dyn CoopTask>>;

/// Ordered registry of cooperative tasks.
#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<(TaskHandle, TaskFlags)>,
}

impl TaskManager {
    pub fn new() -> Self { Self::default() }

    /// Registers a task for the given callbacks.
    ///
    /// Tasks are kept in registration order; there is no capacity limit.
    pub fn register(&mut self, task: TaskHandle, flags: TaskFlags) {
        trace!("Registering task #{} with {flags:?}", self.tasks.len());
        self.tasks.push((task, flags));
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize { self.tasks.len() }

    pub fn is_empty(&self) -> bool { self.tasks.is_empty() }

    /// Runs `init_task` on every task registered with [`TaskFlags::INIT`].
    pub fn init_all_tasks(&self) { self.forward(TaskFlags::INIT, |task| task.init_task()); }

    /// Runs `start_task` on every task registered with [`TaskFlags::START`].
    pub fn start_all_tasks(&self, mode: RunMode) {
        self.forward(TaskFlags::START, |task| task.start_task(mode));
    }

    /// Runs `stop_task`, last-registered first.
    pub fn stop_all_tasks(&self, mode: RunMode) {
        self.reverse(TaskFlags::STOP, |task| task.stop_task(mode));
    }

    /// Runs `process_input` in registration order.
    pub fn process_all_inputs(&self, mode: RunMode) {
        self.forward(TaskFlags::INPUT, |task| task.process_input(mode));
    }

    /// Runs `process_action`, last-registered first.
    pub fn process_all_actions(&self, mode: RunMode) {
        self.reverse(TaskFlags::ACTION, |task| task.process_action(mode));
    }

    fn forward(&self, flag: TaskFlags, mut callback: impl FnMut(&mut dyn CoopTask)) {
        for (idx, (task, flags)) in self.tasks.iter().enumerate() {
            if flags.contains(flag) {
                dispatch(idx, task, flag, &mut callback);
            }
        }
    }

    fn reverse(&self, flag: TaskFlags, mut callback: impl FnMut(&mut dyn CoopTask)) {
        for (idx, (task, flags)) in self.tasks.iter().enumerate().rev() {
            if flags.contains(flag) {
                dispatch(idx, task, flag, &mut callback);
            }
        }
    }
}

fn dispatch(
    idx: usize,
    task: &TaskHandle,
    flag: TaskFlags,
    callback: &mut impl FnMut(&mut dyn CoopTask),
) {
    match task.try_borrow_mut() {
        Ok(mut task) => callback(&mut *task),
        Err(e) => warn!("Skipping {flag:?} for task #{idx}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log:  Rc<RefCell<Vec<String>>>,
    }

    impl CoopTask for Recorder {
        fn init_task(&mut self) { self.log.borrow_mut().push(format!("{}:init", self.name)); }

        fn start_task(&mut self, mode: RunMode) {
            self.log.borrow_mut().push(format!("{}:start:{mode}", self.name));
        }

        fn stop_task(&mut self, mode: RunMode) {
            self.log.borrow_mut().push(format!("{}:stop:{mode}", self.name));
        }

        fn process_input(&mut self, _mode: RunMode) {
            self.log.borrow_mut().push(format!("{}:input", self.name));
        }

        fn process_action(&mut self, _mode: RunMode) {
            self.log.borrow_mut().push(format!("{}:action", self.name));
        }
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> TaskHandle {
        Rc::new(RefCell::new(Recorder {
            name,
            log: log.clone(),
        }))
    }

    #[test]
    fn actions_run_in_reverse_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = TaskManager::new();
        tasks.register(recorder("a", &log), TaskFlags::ACTION);
        tasks.register(recorder("b", &log), TaskFlags::ACTION);

        tasks.process_all_actions(RunMode::TeleOp);
        assert_eq!(*log.borrow(), vec!["b:action", "a:action"]);
    }

    #[test]
    fn inputs_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = TaskManager::new();
        tasks.register(recorder("a", &log), TaskFlags::INPUT);
        tasks.register(recorder("b", &log), TaskFlags::INPUT);

        tasks.process_all_inputs(RunMode::TeleOp);
        assert_eq!(*log.borrow(), vec!["a:input", "b:input"]);
    }

    #[test]
    fn only_subscribed_callbacks_are_called() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = TaskManager::new();
        tasks.register(recorder("a", &log), TaskFlags::INIT | TaskFlags::STOP);
        tasks.register(recorder("b", &log), TaskFlags::START | TaskFlags::STOP);
        tasks.register(recorder("c", &log), TaskFlags::empty());

        tasks.init_all_tasks();
        tasks.start_all_tasks(RunMode::Autonomous);
        tasks.process_all_inputs(RunMode::Autonomous);
        tasks.process_all_actions(RunMode::Autonomous);
        tasks.stop_all_tasks(RunMode::Autonomous);

        assert_eq!(
            *log.borrow(),
            vec![
                "a:init",
                "b:start:AUTONOMOUS",
                "b:stop:AUTONOMOUS",
                "a:stop:AUTONOMOUS",
            ]
        );
    }

    #[test]
    fn registration_has_no_fixed_capacity() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = TaskManager::new();
        for _ in 0..100 {
            tasks.register(recorder("t", &log), TaskFlags::INPUT);
        }
        assert_eq!(tasks.len(), 100);
        tasks.process_all_inputs(RunMode::TeleOp);
        assert_eq!(log.borrow().len(), 100);
    }

    #[test]
    fn borrowed_task_is_skipped() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = TaskManager::new();
        let busy = recorder("busy", &log);
        tasks.register(busy.clone(), TaskFlags::ACTION);
        tasks.register(recorder("free", &log), TaskFlags::ACTION);

        let _guard = busy.borrow_mut();
        tasks.process_all_actions(RunMode::TeleOp);
        assert_eq!(*log.borrow(), vec!["free:action"]);
    }
}
