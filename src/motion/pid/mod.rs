//! PID control for robot subsystems.
//!
//! This module provides the PID controller primitive and the subsystems
//! built on top of it. Each subsystem owns its controllers and is driven once
//! per period by the [`TaskManager`](crate::task::TaskManager).
//!
//! # Available Controllers
//!
//! - `ctrl`: The [`PIDController`](ctrl::PIDController) arithmetic primitive.
//! - `pid`: [`PIDDrive`](pid::PIDDrive), distance and heading control of a
//!   drive base with two (drive + turn) or three (x + y + turn) controllers.
//! - `singlepid`: [`PIDActuator`](singlepid::PIDActuator), position control
//!   of a single mechanism such as a lift winch or an arm.
//!
//! # How PID Works
//!
//! PID control calculates motor output based on three terms:
//!
//! - **P (Proportional)**: Output proportional to the error (distance from target).
//! - **I (Integral)**: Output proportional to accumulated error.
//! - **D (Derivative)**: Output proportional to the change in error since the
//!   last cycle.
//!
//! The formula is: `output = Kp*error + Ki*Σerror + Kd*Δerror`
//!
//! # Tuning
//!
//! Start with Kp and increase until the mechanism reaches the target.
//! Add Kd to reduce overshoot. Only add Ki if the mechanism consistently
//! stops short.

/// The PID controller primitive.
pub mod ctrl;

/// PID controlled drive base.
///
/// Drives a chassis by a relative distance and/or heading change, with
/// optional stop-on-target, timeout and completion event.
pub mod pid;

/// PID controlled single actuator.
///
/// Useful for mechanisms like arms, lifts, or winches that move to a
/// position independently from the drivetrain.
pub mod singlepid;

/// Option switches for a [`PIDController`](ctrl::PIDController).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PIDOptions {
    /// Negates the error before computing the output.
    pub inverse:           bool,
    /// Treats setpoints as absolute values instead of offsets from the
    /// current input.
    pub absolute_setpoint: bool,
}

/// Static configuration of one PID controller.
///
/// These are the per-robot constants tuned on the practice field.
///
/// # Example
///
/// ```ignore
/// use oceanus::motion::pid::PIDConfig;
///
/// const GYRO_TURN: PIDConfig = PIDConfig {
///     tolerance: 2.0,
///     settling_time: 200,
///     ..PIDConfig::new(0.05, 0.0, 0.0)
/// };
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PIDConfig {
    /// Proportional gain.
    pub kp:            f64,
    /// Integral gain.
    pub ki:            f64,
    /// Derivative gain.
    pub kd:            f64,
    /// Largest error still considered on target.
    pub tolerance:     f64,
    /// Milliseconds the error must stay within tolerance.
    pub settling_time: u64,
    pub options:       PIDOptions,
    /// Range setpoints are clamped to, if any.
    pub input_range:   Option<(f64, f64)>,
    /// Range the output is clamped to.
    pub output_range:  (f64, f64),
}

impl PIDConfig {
    /// Creates a configuration with the given gains, zero tolerance and
    /// settling time, relative setpoints and a `[-1.0, 1.0]` output range.
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            tolerance: 0.0,
            settling_time: 0,
            options: PIDOptions {
                inverse:           false,
                absolute_setpoint: false,
            },
            input_range: None,
            output_range: (-1.0, 1.0),
        }
    }
}

impl Default for PIDConfig {
    fn default() -> Self { Self::new(1.0, 0.0, 0.0) }
}

/// The measurement a controller is closing the loop on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PIDRole {
    /// Forward distance of a non-holonomic drive base.
    Drive,
    /// Lateral distance of a holonomic drive base.
    X,
    /// Forward distance of a holonomic drive base.
    Y,
    /// Heading.
    Turn,
    /// Mapped line sensor position.
    Sensor,
    /// Position of a single mechanism.
    Actuator,
}

/// Supplies measurements to PID controlled subsystems.
///
/// A drive base typically implements this once and answers for every role
/// its sensors cover. Closures taking a [`PIDRole`] also work:
///
/// ```ignore
/// let input = make_cloneable(|_role: PIDRole| encoder.distance());
/// ```
pub trait PIDInput {
    /// Returns the current measurement for `role`.
    fn input(&mut self, role: PIDRole) -> f64;
}

impl<F: FnMut(PIDRole) -> f64> PIDInput for F {
    fn input(&mut self, role: PIDRole) -> f64 { self(role) }
}
