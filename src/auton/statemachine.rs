//! Step state machine for autonomous sequences.
//!
//! An autonomous routine is a numbered list of steps. Each step starts one or
//! more operations (a drive, a lift move, a timer), then hands their
//! completion [`Event`]s to [`StateMachine::wait_for_events`] along with the
//! step to run next. The periodic callback polls [`StateMachine::is_ready`]
//! and only runs a step's body while it returns `true`.
//!
//! # Example
//!
//! ```ignore
//! const DRIVE: u32 = STATE_STARTED;
//! const TURN: u32 = DRIVE + 1;
//! const DONE: u32 = TURN + 1;
//!
//! fn autonomous_periodic(&mut self) {
//!     if !self.sm.is_ready() {
//!         return;
//!     }
//!     match self.sm.current_state() {
//!         DRIVE => {
//!             self.drive.borrow_mut().set_target(48.0, 0.0, true, Some(self.done.clone()), 4000);
//!             self.sm.wait_for_events(&[self.done.clone()], TURN, WaitPolicy::Any)?;
//!         }
//!         TURN => { /* ... */ }
//!         _ => self.sm.stop(),
//!     }
//! }
//! ```

use heapless::Vec;
use log::{debug, info};
use thiserror::Error;

use crate::event::Event;

/// The state of a stopped machine.
pub const STATE_DISABLED: u32 = 0;
/// The default first step.
pub const STATE_STARTED: u32 = 1;
/// Most events a single step can wait on.
pub const MAX_WAIT_EVENTS: usize = 8;

/// How the waited events combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Advance once any event is signaled.
    #[default]
    Any,
    /// Advance once every event is signaled.
    All,
}

/// Errors raised when arming a wait.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("cannot wait on {count} events, at most {max} are supported", max = MAX_WAIT_EVENTS)]
    TooManyEvents { count: usize },
}

/// A step sequencer gated on [`Event`]s.
#[derive(Debug, Default)]
pub struct StateMachine {
    current: u32,
    next:    u32,
    ready:   bool,
    policy:  WaitPolicy,
    events:  Vec<Event, MAX_WAIT_EVENTS>,
}

impl StateMachine {
    /// Creates a disabled state machine.
    pub fn new() -> Self { Self::default() }

    /// Starts the machine at `state`, ready to run it.
    ///
    /// Starting at [`STATE_DISABLED`] leaves the machine disabled.
    pub fn start(&mut self, state: u32) {
        self.events.clear();
        self.current = state;
        self.next = state;
        self.policy = WaitPolicy::Any;
        self.ready = true;
        info!("State machine started at step {state}");
    }

    /// Disables the machine. Pending waits are dropped without clearing
    /// their events.
    pub fn stop(&mut self) {
        self.events.clear();
        self.current = STATE_DISABLED;
        self.next = STATE_DISABLED;
        self.ready = false;
        info!("State machine stopped");
    }

    pub fn is_enabled(&self) -> bool { self.current != STATE_DISABLED }

    /// Returns `true` if the current step should run.
    ///
    /// While waiting, this checks the events against the wait policy. Once
    /// satisfied, the events are cleared, the machine advances to the next
    /// step and stays ready until the next
    /// [`wait_for_events`](Self::wait_for_events).
    pub fn is_ready(&mut self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if self.ready {
            return true;
        }

        let satisfied = match self.policy {
            WaitPolicy::Any => self.events.is_empty() || self.events.iter().any(Event::is_signaled),
            WaitPolicy::All => self.events.iter().all(Event::is_signaled),
        };
        if satisfied {
            self.clear_all_events();
            self.events.clear();
            debug!("Step {} complete, advancing to {}", self.current, self.next);
            self.current = self.next;
            self.ready = true;
        }
        satisfied
    }

    /// Waits on `events` before advancing to `next`.
    ///
    /// The events are cleared when the wait is armed. An empty list is
    /// satisfied on the next [`is_ready`](Self::is_ready) poll.
    ///
    /// # Errors
    ///
    /// [`StateMachineError::TooManyEvents`] if more than
    /// [`MAX_WAIT_EVENTS`] events are given. The machine is left unchanged.
    pub fn wait_for_events(
        &mut self,
        events: &[Event],
        next: u32,
        policy: WaitPolicy,
    ) -> Result<(), StateMachineError> {
        let waited = Vec::<Event, MAX_WAIT_EVENTS>::from_slice(events).map_err(|_| {
            StateMachineError::TooManyEvents {
                count: events.len(),
            }
        })?;
        self.events = waited;
        self.clear_all_events();
        self.next = next;
        self.policy = policy;
        self.ready = false;
        debug!(
            "Step {} waiting on {} event(s) ({policy:?}), next {next}",
            self.current,
            events.len()
        );
        Ok(())
    }

    pub fn current_state(&self) -> u32 { self.current }

    /// Jumps to `state` without touching the ready flag or the waited events.
    pub fn set_current_state(&mut self, state: u32) { self.current = state; }

    /// Clears every waited event.
    pub fn clear_all_events(&self) {
        for event in &self.events {
            event.clear();
        }
    }
}
