//! Single-shot completion signals and the timer that fires them.
//!
//! An [`Event`] is how a subsystem tells an autonomous sequence that an
//! operation finished: the sequence hands a clone of the event to
//! `set_target`/`start`, then waits on it with
//! [`StateMachine::wait_for_events`](crate::auton::statemachine::StateMachine::wait_for_events).
//! Events are polled, never blocked on.
//!
//! [`EventTimer`] signals an event once a duration has elapsed, for steps
//! like "push the tube out for 1.5 seconds".

use std::{cell::Cell, rc::Rc};

use log::debug;

use crate::{
    task::{CoopTask, RunMode},
    time::SharedClock,
};

/// A shared, single-shot, polled flag.
///
/// Cloning an event yields another handle to the same flag.
///
/// # Example
///
/// ```ignore
/// let done = Event::new();
/// lift.set_target(12.0, true, Some(done.clone()), 2000);
/// // ... later, in a periodic callback
/// if done.is_signaled() { /* next step */ }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Event {
    signaled: Rc<Cell<bool>>,
}

impl Event {
    /// Creates an event in the cleared state.
    pub fn new() -> Self { Self::default() }

    /// Signals the event.
    pub fn signal(&self) { self.signaled.set(true); }

    /// Returns `true` if the event has been signaled since it was last cleared.
    pub fn is_signaled(&self) -> bool { self.signaled.get() }

    /// Clears the event.
    pub fn clear(&self) { self.signaled.set(false); }

    /// Returns `true` if both handles refer to the same event.
    pub fn same_as(&self, other: &Event) -> bool { Rc::ptr_eq(&self.signaled, &other.signaled) }
}

/// A polled one-shot timer that signals an [`Event`] on expiry.
///
/// Register it with the task manager for `INPUT | STOP` so it is polled
/// every period and cancelled when the robot leaves a mode.
pub struct EventTimer {
    clock: SharedClock,
    armed: Option<(u64, Event)>,
}

impl EventTimer {
    /// Creates a disarmed timer.
    pub fn new(clock: SharedClock) -> Self { Self { clock, armed: None } }

    /// Arms the timer to signal `event` after `duration_ms`.
    ///
    /// The event is cleared first. Re-arming replaces any pending expiry.
    pub fn set(&mut self, duration_ms: u64, event: Event) {
        event.clear();
        let deadline = self.clock.millis().saturating_add(duration_ms);
        debug!("Timer armed for {duration_ms} ms (deadline {deadline})");
        self.armed = Some((deadline, event));
    }

    /// Disarms the timer without signaling.
    pub fn cancel(&mut self) {
        if self.armed.take().is_some() {
            debug!("Timer cancelled");
        }
    }

    /// Returns `true` while an expiry is pending.
    pub fn is_armed(&self) -> bool { self.armed.is_some() }

    /// Signals the event if the deadline has passed.
    ///
    /// Returns `true` on the poll that fires the event.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.millis();
        let expired = matches!(&self.armed, Some((deadline, _)) if now >= *deadline);
        if !expired {
            return false;
        }
        if let Some((_, event)) = self.armed.take() {
            event.signal();
        }
        true
    }
}

impl CoopTask for EventTimer {
    fn stop_task(&mut self, _mode: RunMode) { self.cancel(); }

    fn process_input(&mut self, _mode: RunMode) { self.poll(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    #[test]
    fn clones_share_the_flag() {
        let event = Event::new();
        let other = event.clone();
        other.signal();
        assert!(event.is_signaled());
        event.clear();
        assert!(!other.is_signaled());
        assert!(event.same_as(&other));
        assert!(!event.same_as(&Event::new()));
    }

    #[test]
    fn timer_fires_once_at_deadline() {
        let clock = ManualClock::new();
        let mut timer = EventTimer::new(clock.shared());
        let event = Event::new();
        event.signal();

        timer.set(500, event.clone());
        assert!(!event.is_signaled(), "arming clears the event");

        clock.advance(499);
        assert!(!timer.poll());
        assert!(!event.is_signaled());

        clock.advance(1);
        assert!(timer.poll());
        assert!(event.is_signaled());
        assert!(!timer.is_armed());

        event.clear();
        clock.advance(1000);
        assert!(!timer.poll());
        assert!(!event.is_signaled());
    }

    #[test]
    fn huge_duration_never_fires_early() {
        let clock = ManualClock::starting_at(1000);
        let mut timer = EventTimer::new(clock.shared());
        let event = Event::new();
        timer.set(u64::MAX, event.clone());

        clock.advance(60_000);
        assert!(!timer.poll());
        assert!(!event.is_signaled());
        assert!(timer.is_armed());
    }

    #[test]
    fn stop_task_cancels_pending_timer() {
        let clock = ManualClock::new();
        let mut timer = EventTimer::new(clock.shared());
        let event = Event::new();
        timer.set(100, event.clone());

        timer.stop_task(RunMode::Autonomous);
        clock.advance(200);
        timer.process_input(RunMode::Autonomous);
        assert!(!event.is_signaled());
    }
}
