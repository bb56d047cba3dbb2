//! Monotonic millisecond time sources.
//!
//! Every timed behavior in the crate (PID settling, target deadlines, event
//! timers, loop pacing) reads time through the [`Clock`] trait instead of
//! asking the platform directly. On the robot the [`SystemClock`] is used;
//! simulations and tests drive a [`ManualClock`] by hand.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use oceanus::time::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let shared: Rc<dyn Clock> = Rc::new(clock.clone());
//!
//! clock.advance(20);
//! assert_eq!(shared.millis(), 20);
//! ```

use std::{
    cell::Cell,
    rc::Rc,
    sync::OnceLock,
    time::{Duration, Instant},
};

/// A monotonic source of millisecond timestamps.
pub trait Clock {
    /// Returns the number of milliseconds elapsed since an arbitrary,
    /// fixed origin. Successive calls never go backwards.
    fn millis(&self) -> u64;
}

/// Shared handle to a clock, as held by controllers and timers.
pub type SharedClock = Rc<dyn Clock>;

static PROGRAM_START: OnceLock<Instant> = OnceLock::new();

/// Returns the time elapsed since the program first asked for the time.
///
/// This is the origin used by [`SystemClock`] and by the logger timestamps,
/// so log lines and control timestamps line up.
pub fn uptime() -> Duration { PROGRAM_START.get_or_init(Instant::now).elapsed() }

/// Clock backed by the host's monotonic timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a system clock and wraps it in a shareable handle.
    pub fn shared() -> SharedClock { Rc::new(SystemClock) }
}

impl Clock for SystemClock {
    fn millis(&self) -> u64 { uptime().as_millis() as u64 }
}

/// Clock whose time only moves when told to.
///
/// Clones share the same counter, so a test can keep one handle to advance
/// time while the controllers under test hold the others.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Creates a clock that starts at 0 ms.
    pub fn new() -> Self { Self::default() }

    /// Creates a clock that starts at `millis`.
    pub fn starting_at(millis: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(millis)),
        }
    }

    /// Moves time forward by `millis`.
    pub fn advance(&self, millis: u64) { self.now.set(self.now.get() + millis); }

    /// Jumps to an absolute time. Moving backwards is ignored.
    pub fn set(&self, millis: u64) {
        if millis > self.now.get() {
            self.now.set(millis);
        }
    }

    /// Returns a shareable handle reading this clock.
    pub fn shared(&self) -> SharedClock { Rc::new(self.clone()) }
}

impl Clock for ManualClock {
    fn millis(&self) -> u64 { self.now.get() }
}
