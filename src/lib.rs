//! # Oceanus
//!
//! Oceanus is the control core of a competition robot: a cooperative,
//! single-threaded runtime that every subsystem (drive base, lift, line
//! follower, kicker) plugs into. It provides:
//!
//! - **Task Scheduling**: An ordered registry of cooperative tasks with
//!   init/start/stop/input/action phases.
//! - **Motion Control**: A PID controller with settling-time on-target
//!   detection, and PID driven drive base, actuator and line follower
//!   subsystems.
//! - **Autonomous Sequencing**: A step state machine that advances on
//!   completion events and timers.
//! - **Competition Loop**: Disabled/autonomous/teleop dispatch with fixed
//!   period pacing and overrun warnings.
//! - **Logging**: A console and file logger for debugging and telemetry.
//!
//! Hardware is reached only through the [`drivetrain::MotorOutput`],
//! [`drivetrain::DriveOutput`], [`motion::pid::PIDInput`] and
//! [`motion::linefollow::SensorArray`] traits.
//!
//! ## Quick Start
//!
//! ```ignore
//! use oceanus::{competition::*, task::*, time::SystemClock, make_cloneable};
//!
//! struct MyRobot { /* subsystems */ }
//!
//! impl Robot for MyRobot {
//!     fn robot_init(&mut self, tasks: &mut TaskManager) {
//!         tasks.register(self.pid_drive.clone(), TaskFlags::STOP | TaskFlags::ACTION);
//!     }
//!
//!     fn autonomous_periodic(&mut self) { /* state machine steps */ }
//! }
//!
//! fn main() {
//!     oceanus::fs::logger::init(log::LevelFilter::Info).ok();
//!     let clock = SystemClock::shared();
//!     let mut competition = Competition::new(MyRobot::new(clock.clone()), clock, LoopConfig::default());
//!     competition.init();
//!     competition.run(|| Some(read_field_state()));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: The cooperative task manager.
//! - [`motion`]: PID control and line following.
//! - [`auton`]: The autonomous step state machine.
//! - [`competition`]: The competition mode loop.
//! - [`drivetrain`]: Motor and drive base outputs.
//! - [`event`]: Completion events and event timers.
//! - [`time`]: Clocks.
//! - [`fs`]: Filesystem utilities including logging.

/// Autonomous sequencing module.
///
/// Provides the [`StateMachine`](auton::statemachine::StateMachine) used to
/// write autonomous routines as event-gated steps.
pub mod auton;

/// Competition mode loop.
pub mod competition;

/// Drive base output module.
///
/// Provides the motor and drive base traits, plus the
/// [`Differential`](drivetrain::Differential) and
/// [`Mecanum`](drivetrain::Mecanum) mixers.
pub mod drivetrain;

/// Completion events and event timers.
pub mod event;

/// Filesystem utilities module.
///
/// Contains logging functionality for recording robot telemetry and debug
/// information to a file.
pub mod fs;

/// Closed-loop motion control module.
///
/// - **PID Control**: The PID controller plus drive base and actuator
///   subsystems.
/// - **Line Following**: Light sensor arrays and the line follower.
pub mod motion;

/// Cooperative task scheduling.
pub mod task;

/// Clocks.
pub mod time;

use std::{cell::RefCell, rc::Rc};

/// Makes an object clonable by wrapping it in `Rc` and `RefCell`
pub fn make_cloneable<T>(t: T) -> Rc<RefCell<T>> { Rc::new(RefCell::new(t)) }
