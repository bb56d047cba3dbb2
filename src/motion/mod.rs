//! Closed-loop motion control.
//!
//! This module provides the subsystems that move the robot during
//! autonomous sequences and assist the driver in teleop:
//!
//! - **PID Control**: the PID controller primitive plus drive base and
//!   single-actuator subsystems built on it.
//! - **Line Following**: a PID steered line follower over a light sensor
//!   array.
//!
//! # Architecture
//!
//! Every subsystem is a [`CoopTask`](crate::task::CoopTask). Mode code sets a
//! target and moves on; the subsystem updates its outputs once per period in
//! the action phase and signals an [`Event`](crate::event::Event) when it is
//! done.
//!
//! # Example
//!
//! ```ignore
//! use oceanus::motion::pid::pid::PIDDrive;
//!
//! let pid_drive = make_cloneable(PIDDrive::new(/* ... */));
//! tasks.register(pid_drive.clone(), TaskFlags::STOP | TaskFlags::ACTION);
//!
//! // Later, from a state machine step:
//! pid_drive.borrow_mut().set_target(24.0, 0.0, true, Some(done.clone()), 2000);
//! sm.wait_for_events(&[done.clone()], next_step, WaitPolicy::Any)?;
//! ```

/// Line sensor arrays and the line follower.
pub mod linefollow;

/// PID control algorithms.
///
/// Contains the controller primitive and the subsystems built on it:
/// - [`ctrl`](pid::ctrl): The PID controller itself.
/// - [`pid`](pid::pid): Distance and heading control of a drive base.
/// - [`singlepid`](pid::singlepid): PID for a single motor.
pub mod pid;
