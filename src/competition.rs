//! The competition loop.
//!
//! [`Competition`] owns the [`TaskManager`] and a [`Robot`], and turns the
//! field state (enabled? autonomous?) into mode transitions and periodic
//! callbacks:
//!
//! - **Disabled**: waits for the robot to be enabled, calling the disabled
//!   callbacks meanwhile.
//! - **Autonomous / TeleOp**: every period runs task inputs, the mode's
//!   periodic callback, then task actions. The continuous callback runs on
//!   every pass, period or not.
//!
//! Leaving an enabled mode stops every task and returns to disabled.
//!
//! # Example
//!
//! ```ignore
//! use oceanus::competition::{Competition, FieldState, LoopConfig};
//!
//! let mut competition = Competition::new(MyRobot::new(clock.clone()), clock, LoopConfig::default());
//! competition.init();
//! competition.run(|| Some(field.read()));
//! ```

use std::{thread, time::Duration};

use humantime::format_duration;
use log::{debug, info, warn};

use crate::{
    task::{RunMode, TaskManager},
    time::SharedClock,
};

/// Robot specific callbacks.
///
/// Every callback defaults to doing nothing. Subsystems are registered with
/// the task manager in [`robot_init`](Robot::robot_init); the mode callbacks
/// then only issue targets and read events.
pub trait Robot {
    /// Called once, before any task is initialized.
    fn robot_init(&mut self, _tasks: &mut TaskManager) {}

    fn disabled_start(&mut self) {}
    fn disabled_periodic(&mut self) {}
    fn disabled_continuous(&mut self) {}
    fn disabled_stop(&mut self) {}

    fn autonomous_start(&mut self) {}
    fn autonomous_periodic(&mut self) {}
    fn autonomous_continuous(&mut self) {}
    fn autonomous_stop(&mut self) {}

    fn teleop_start(&mut self) {}
    fn teleop_periodic(&mut self) {}
    fn teleop_continuous(&mut self) {}
    fn teleop_stop(&mut self) {}
}

/// What the field control system reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldState {
    pub enabled:    bool,
    pub autonomous: bool,
}

impl FieldState {
    pub const fn disabled() -> Self {
        Self {
            enabled:    false,
            autonomous: false,
        }
    }

    pub const fn autonomous() -> Self {
        Self {
            enabled:    true,
            autonomous: true,
        }
    }

    pub const fn teleop() -> Self {
        Self {
            enabled:    true,
            autonomous: false,
        }
    }

    /// The mode the robot should be running in.
    pub fn mode(&self) -> RunMode {
        match (self.enabled, self.autonomous) {
            (false, _) => RunMode::Disabled,
            (true, true) => RunMode::Autonomous,
            (true, false) => RunMode::TeleOp,
        }
    }
}

/// Loop timing configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopConfig {
    /// Length of one period in milliseconds. `0` runs a period on every pass.
    pub period_ms:     u64,
    /// Fraction of the period a pass may use before an overrun is logged.
    pub overrun_ratio: f64,
    /// Milliseconds [`Competition::run`] sleeps between passes.
    pub idle_ms:       u64,
}

impl LoopConfig {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            ..Self::default()
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            period_ms:     20,
            overrun_ratio: 0.9,
            idle_ms:       1,
        }
    }
}

/// Loop counters for the current mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Periods run.
    pub loops:    u32,
    /// Milliseconds spent inside periods.
    pub busy_ms:  u64,
    /// Periods that ran over the overrun threshold.
    pub overruns: u32,
    /// When the mode was entered.
    pub start_ms: u64,
}

/// The competition mode loop.
pub struct Competition<R: Robot> {
    robot:       R,
    tasks:       TaskManager,
    clock:       SharedClock,
    config:      LoopConfig,
    mode:        RunMode,
    next_period: u64,
    stats:       LoopStats,
}

impl<R: Robot> Competition<R> {
    pub fn new(robot: R, clock: SharedClock, config: LoopConfig) -> Self {
        Self {
            robot,
            tasks: TaskManager::new(),
            clock,
            config,
            mode: RunMode::Disabled,
            next_period: 0,
            stats: LoopStats::default(),
        }
    }

    /// Initializes the robot and every registered task, then enters disabled.
    pub fn init(&mut self) {
        self.robot.robot_init(&mut self.tasks);
        info!("Robot initialized with {} task(s)", self.tasks.len());
        self.tasks.init_all_tasks();
        self.mode = RunMode::Disabled;
        self.enter_stats();
        self.robot.disabled_start();
    }

    /// Runs passes until `field` returns `None`.
    pub fn run(&mut self, mut field: impl FnMut() -> Option<FieldState>) {
        while let Some(state) = field() {
            self.step(state);
            if self.config.idle_ms > 0 {
                thread::sleep(Duration::from_millis(self.config.idle_ms));
            }
        }
        if self.mode != RunMode::Disabled {
            self.leave_mode();
        }
    }

    /// Runs one pass of the mode loop for the given field state.
    pub fn step(&mut self, field: FieldState) {
        match self.mode {
            RunMode::Disabled => {
                if field.enabled {
                    self.enter_mode(field.mode());
                } else {
                    if self.period_ready() {
                        self.robot.disabled_periodic();
                    }
                    self.robot.disabled_continuous();
                }
            }
            mode if field.mode() == mode => {
                if self.period_ready() {
                    self.run_period(mode);
                }
                match mode {
                    RunMode::Autonomous => self.robot.autonomous_continuous(),
                    _ => self.robot.teleop_continuous(),
                }
            }
            _ => self.leave_mode(),
        }
    }

    /// The mode currently running.
    pub fn mode(&self) -> RunMode { self.mode }

    /// Counters for the current mode.
    pub fn stats(&self) -> LoopStats { self.stats }

    pub fn robot(&self) -> &R { &self.robot }

    pub fn robot_mut(&mut self) -> &mut R { &mut self.robot }

    pub fn tasks(&self) -> &TaskManager { &self.tasks }

    fn enter_mode(&mut self, mode: RunMode) {
        self.log_stats();
        self.robot.disabled_stop();
        info!("Entering {mode}");
        self.mode = mode;
        match mode {
            RunMode::Autonomous => self.robot.autonomous_start(),
            _ => self.robot.teleop_start(),
        }
        self.tasks.start_all_tasks(mode);
        self.enter_stats();
    }

    fn leave_mode(&mut self) {
        let mode = self.mode;
        info!("Leaving {mode}");
        self.tasks.stop_all_tasks(mode);
        match mode {
            RunMode::Autonomous => self.robot.autonomous_stop(),
            _ => self.robot.teleop_stop(),
        }
        self.log_stats();
        self.mode = RunMode::Disabled;
        self.enter_stats();
        self.robot.disabled_start();
    }

    fn run_period(&mut self, mode: RunMode) {
        let begin = self.clock.millis();
        self.tasks.process_all_inputs(mode);
        match mode {
            RunMode::Autonomous => self.robot.autonomous_periodic(),
            _ => self.robot.teleop_periodic(),
        }
        self.tasks.process_all_actions(mode);
        let used = self.clock.millis().saturating_sub(begin);

        self.stats.loops += 1;
        self.stats.busy_ms += used;
        if self.config.period_ms > 0 &&
            used as f64 > self.config.period_ms as f64 * self.config.overrun_ratio
        {
            self.stats.overruns += 1;
            warn!(
                "{mode} period ran too long ({used} ms of {} ms)",
                self.config.period_ms
            );
        }
    }

    fn period_ready(&mut self) -> bool {
        if self.config.period_ms == 0 {
            return true;
        }
        let now = self.clock.millis();
        if now < self.next_period {
            return false;
        }
        self.next_period += self.config.period_ms;
        if self.next_period <= now {
            debug!("Skipping missed periods");
            self.next_period = now + self.config.period_ms;
        }
        true
    }

    fn enter_stats(&mut self) {
        let now = self.clock.millis();
        self.stats = LoopStats {
            start_ms: now,
            ..LoopStats::default()
        };
        self.next_period = now;
    }

    fn log_stats(&self) {
        let elapsed = self.clock.millis().saturating_sub(self.stats.start_ms);
        let average = self
            .stats
            .busy_ms
            .checked_div(u64::from(self.stats.loops))
            .unwrap_or(0);
        info!(
            "{} ran {} loop(s) in {} (busy {}, average {} ms, {} overrun(s))",
            self.mode,
            self.stats.loops,
            format_duration(Duration::from_millis(elapsed)),
            format_duration(Duration::from_millis(self.stats.busy_ms)),
            average,
            self.stats.overruns
        );
    }
}
