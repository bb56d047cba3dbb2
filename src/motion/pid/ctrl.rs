//! The generic PID controller primitive.
//!
//! [`PIDController`] only does arithmetic: it is handed the current input,
//! returns a bounded output, and keeps track of whether the input has settled
//! on the setpoint. It never reads a sensor or drives a motor itself. The
//! subsystems in [`singlepid`](super::singlepid), [`pid`](super::pid) and
//! [`linefollow`](crate::motion::linefollow) own one or more controllers and
//! feed them once per action cycle.
//!
//! # Output
//!
//! ```text
//! error  = setpoint - input            (negated when `inverse` is set)
//! output = Kp*error + Ki*Σerror + Kd*(error - previous error)
//! ```
//!
//! The output is always clamped to the output range. The error sum only grows
//! while `Ki * (Σerror + error)` stays strictly inside the output range, so the
//! integral term cannot wind up while the output is saturated.
//!
//! # On Target
//!
//! [`on_target`](PIDController::on_target) is true once the error has stayed
//! within the tolerance, without interruption, for at least the settling
//! time. Any reading outside the tolerance restarts the settling period.
//!
//! # Example
//!
//! ```ignore
//! use oceanus::motion::pid::ctrl::PIDController;
//! use oceanus::time::SystemClock;
//!
//! let mut turn = PIDController::new(0.05, 0.0, 0.01, SystemClock::shared())
//!     .with_tolerance(2.0, 250);
//!
//! turn.set_target(90.0, gyro.angle());   // 90 degrees from here
//! loop {
//!     if turn.on_target() { break; }
//!     drive.arcade(0.0, turn.calc_output(gyro.angle()));
//! }
//! ```

use log::trace;

use super::{PIDConfig, PIDOptions};
use crate::time::SharedClock;

/// A proportional-integral-derivative controller.
pub struct PIDController {
    kp:             f64,
    ki:             f64,
    kd:             f64,
    tolerance:      f64,
    settling_time:  u64,
    options:        PIDOptions,
    min_input:      f64,
    max_input:      f64,
    min_output:     f64,
    max_output:     f64,
    prev_error:     f64,
    total_error:    f64,
    start_settling: u64,
    setpoint:       f64,
    clock:          SharedClock,
}

impl PIDController {
    /// Creates a controller with the given gains.
    ///
    /// The tolerance and settling time start at zero, the input range is
    /// unbounded and the output range is `[-1.0, 1.0]`.
    pub fn new(kp: f64, ki: f64, kd: f64, clock: SharedClock) -> Self {
        Self {
            kp,
            ki,
            kd,
            tolerance: 0.0,
            settling_time: 0,
            options: PIDOptions::default(),
            min_input: 0.0,
            max_input: 0.0,
            min_output: -1.0,
            max_output: 1.0,
            prev_error: 0.0,
            total_error: 0.0,
            start_settling: 0,
            setpoint: 0.0,
            clock,
        }
    }

    /// Creates a controller from a [`PIDConfig`].
    pub fn from_config(config: &PIDConfig, clock: SharedClock) -> Self {
        let mut ctrl = Self::new(config.kp, config.ki, config.kd, clock)
            .with_tolerance(config.tolerance, config.settling_time)
            .with_options(config.options)
            .with_output_range(config.output_range.0, config.output_range.1);
        if let Some((min, max)) = config.input_range {
            ctrl.set_input_range(min, max);
        }
        ctrl
    }

    /// Sets the on-target tolerance and the settling time in milliseconds.
    pub fn with_tolerance(mut self, tolerance: f64, settling_time: u64) -> Self {
        self.tolerance = tolerance;
        self.settling_time = settling_time;
        self
    }

    /// Sets the controller options.
    pub fn with_options(mut self, options: PIDOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the input range setpoints are clamped to.
    pub fn with_input_range(mut self, min: f64, max: f64) -> Self {
        self.set_input_range(min, max);
        self
    }

    /// Sets the output range.
    pub fn with_output_range(mut self, min: f64, max: f64) -> Self {
        self.set_output_range(min, max);
        self
    }

    /// Clears the error history. Gains and setpoint are kept.
    pub fn reset(&mut self) {
        self.prev_error = 0.0;
        self.total_error = 0.0;
    }

    /// Proportional gain.
    pub fn kp(&self) -> f64 { self.kp }

    /// Integral gain.
    pub fn ki(&self) -> f64 { self.ki }

    /// Derivative gain.
    pub fn kd(&self) -> f64 { self.kd }

    /// Replaces the gains.
    pub fn set_pid(&mut self, kp: f64, ki: f64, kd: f64) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    pub fn options(&self) -> PIDOptions { self.options }

    pub fn set_options(&mut self, options: PIDOptions) { self.options = options; }

    /// The error seen by the last [`calc_output`](Self::calc_output), or the
    /// initial error after [`set_target`](Self::set_target).
    pub fn error(&self) -> f64 { self.prev_error }

    /// The accumulated error driving the integral term.
    pub fn total_error(&self) -> f64 { self.total_error }

    /// The absolute setpoint.
    pub fn target(&self) -> f64 { self.setpoint }

    /// Sets the range setpoints are clamped to. A range with `min >= max`
    /// disables clamping.
    pub fn set_input_range(&mut self, min: f64, max: f64) {
        self.min_input = min;
        self.max_input = max;
    }

    /// Sets the range the output is clamped to.
    pub fn set_output_range(&mut self, min: f64, max: f64) {
        self.min_output = min;
        self.max_output = max;
    }

    /// Sets a new setpoint.
    ///
    /// Unless the controller uses absolute setpoints, `setpoint` is taken as
    /// an offset from `current_input`. The error history is cleared and the
    /// settling period restarts.
    pub fn set_target(&mut self, setpoint: f64, current_input: f64) {
        let mut setpoint = setpoint;
        if !self.options.absolute_setpoint {
            setpoint += current_input;
        }

        self.setpoint = if self.max_input > self.min_input {
            setpoint.clamp(self.min_input, self.max_input)
        } else {
            setpoint
        };
        self.prev_error = self.setpoint - current_input;
        self.total_error = 0.0;
        self.start_settling = self.clock.millis();
        trace!(
            "PID target set: setpoint={}, input={current_input}",
            self.setpoint
        );
    }

    /// Returns `true` once the error has stayed within the tolerance for at
    /// least the settling time.
    ///
    /// Must be polled every cycle: a poll that sees the error outside the
    /// tolerance restarts the settling period.
    pub fn on_target(&mut self) -> bool {
        let now = self.clock.millis();
        if self.prev_error.abs() > self.tolerance {
            self.start_settling = now;
            false
        } else {
            now.saturating_sub(self.start_settling) >= self.settling_time
        }
    }

    /// Computes the bounded output for the current input.
    pub fn calc_output(&mut self, current_input: f64) -> f64 {
        let mut error = self.setpoint - current_input;
        if self.options.inverse {
            error = -error;
        }

        let adj_total_error = self.ki * (self.total_error + error);
        if adj_total_error > self.min_output && adj_total_error < self.max_output {
            self.total_error += error;
        }

        let output = self.kp * error +
            self.ki * self.total_error +
            self.kd * (error - self.prev_error);
        self.prev_error = error;

        let output = clamp_output(output, self.min_output, self.max_output);
        trace!("PID output: input={current_input}, error={error}, output={output}");
        output
    }
}

fn clamp_output(val: f64, min: f64, max: f64) -> f64 {
    if val < min {
        min
    } else if val > max {
        max
    } else {
        val
    }
}
