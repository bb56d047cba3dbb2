//! Autonomous sequencing.
//!
//! Autonomous routines are written as step state machines: each step starts
//! operations on the subsystems and waits on their completion events before
//! moving on.

/// The step state machine.
pub mod statemachine;
