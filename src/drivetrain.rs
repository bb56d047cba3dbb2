//! Drive base outputs.
//!
//! This module defines how the control runtime talks to motors:
//!
//! - [`MotorOutput`]: one speed controller taking a power in `[-1.0, 1.0]`.
//! - [`DriveOutput`]: a chassis taking arcade (drive + turn) or holonomic
//!   (x + y + turn) commands.
//!
//! Two chassis are provided:
//!
//! - [`Differential`]: left and right motor groups, arcade or tank mixing.
//! - [`Mecanum`]: four mecanum wheels with holonomic mixing.
//!
//! # Example
//!
//! ```ignore
//! use oceanus::{drivetrain::{Differential, DriveOutput}, make_cloneable};
//!
//! let drivetrain = make_cloneable(Differential::new(
//!     vec![make_cloneable(left_front), make_cloneable(left_rear)],
//!     vec![make_cloneable(right_front), make_cloneable(right_rear)],
//! ));
//!
//! // In teleop:
//! drivetrain.borrow_mut().arcade(stick.y(), stick.x());
//! ```

use std::{cell::RefCell, rc::Rc};

use log::warn;

/// A single speed controller.
pub trait MotorOutput {
    /// Sets the motor power, from `-1.0` (full reverse) to `1.0` (full forward).
    fn set_power(&mut self, power: f64);
}

/// Shared handle to a motor.
pub type SharedMotor = Rc<RefCell<dyn MotorOutput>>;

/// How a subsystem issues drive commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveMode {
    /// Forward + turn commands through [`DriveOutput::arcade`].
    #[default]
    Arcade,
    /// Lateral + forward + turn commands through [`DriveOutput::holonomic`].
    Mecanum,
}

/// A drive base accepting mixed drive commands.
pub trait DriveOutput {
    /// Drives forward at `drive` power while turning at `turn` power.
    /// Positive `turn` turns clockwise.
    fn arcade(&mut self, drive: f64, turn: f64);

    /// Moves laterally at `x`, forward at `y` and turns at `turn`.
    fn holonomic(&mut self, x: f64, y: f64, turn: f64);

    /// Stops all motors.
    fn stop(&mut self) { self.arcade(0.0, 0.0); }

    /// Issues a command in the given mode. In arcade mode `x` is ignored.
    fn drive(&mut self, mode: DriveMode, x: f64, y: f64, turn: f64) {
        match mode {
            DriveMode::Arcade => self.arcade(y, turn),
            DriveMode::Mecanum => self.holonomic(x, y, turn),
        }
    }

    /// Stops all motors in the given mode.
    fn stop_mode(&mut self, mode: DriveMode) {
        match mode {
            DriveMode::Arcade => self.stop(),
            DriveMode::Mecanum => self.holonomic(0.0, 0.0, 0.0),
        }
    }
}

/// Shared handle to a drive base.
pub type SharedDrive = Rc<RefCell<dyn DriveOutput>>;

/// A differential drivetrain controller.
///
/// This struct manages a robot with separate left and right motor groups.
/// Motors on opposite sides of the drivetrain typically need to spin in
/// opposite directions to move the robot forward; the motor drivers are
/// expected to handle inversion.
#[derive(Clone)]
pub struct Differential {
    /// The left motor group.
    pub left:      Vec<SharedMotor>,
    /// The right motor group.
    pub right:     Vec<SharedMotor>,
    warned_strafe: bool,
}

impl Differential {
    /// Creates a new drivetrain with the provided left/right motors.
    pub fn new(left: Vec<SharedMotor>, right: Vec<SharedMotor>) -> Self {
        Self {
            left,
            right,
            warned_strafe: false,
        }
    }

    /// Drives each side directly.
    pub fn tank(&mut self, left_power: f64, right_power: f64) {
        set_group(&self.left, left_power.clamp(-1.0, 1.0));
        set_group(&self.right, right_power.clamp(-1.0, 1.0));
    }
}

impl DriveOutput for Differential {
    /// Mixes the command into left/right powers as:
    /// - left = drive + turn
    /// - right = drive - turn
    fn arcade(&mut self, drive: f64, turn: f64) { self.tank(drive + turn, drive - turn); }

    /// A differential chassis cannot strafe; `x` is dropped.
    fn holonomic(&mut self, x: f64, y: f64, turn: f64) {
        if x != 0.0 && !self.warned_strafe {
            warn!("Differential drive cannot strafe, ignoring lateral power {x}");
            self.warned_strafe = true;
        }
        self.arcade(y, turn);
    }
}

/// A four-wheel mecanum drivetrain.
#[derive(Clone)]
pub struct Mecanum {
    pub left_front:  SharedMotor,
    pub left_rear:   SharedMotor,
    pub right_front: SharedMotor,
    pub right_rear:  SharedMotor,
}

impl Mecanum {
    pub fn new(
        left_front: SharedMotor,
        left_rear: SharedMotor,
        right_front: SharedMotor,
        right_rear: SharedMotor,
    ) -> Self {
        Self {
            left_front,
            left_rear,
            right_front,
            right_rear,
        }
    }
}

impl DriveOutput for Mecanum {
    fn arcade(&mut self, drive: f64, turn: f64) { self.holonomic(0.0, drive, turn); }

    /// Wheel powers are scaled down together when any of them exceeds 1.0.
    fn holonomic(&mut self, x: f64, y: f64, turn: f64) {
        let mut powers = [
            y + x + turn, // left front
            y - x + turn, // left rear
            y - x - turn, // right front
            y + x - turn, // right rear
        ];
        normalize(&mut powers);
        set_motor(&self.left_front, powers[0]);
        set_motor(&self.left_rear, powers[1]);
        set_motor(&self.right_front, powers[2]);
        set_motor(&self.right_rear, powers[3]);
    }
}

fn normalize(powers: &mut [f64]) {
    let max = powers.iter().fold(0.0_f64, |max, p| max.max(p.abs()));
    if max > 1.0 {
        for p in powers.iter_mut() {
            *p /= max;
        }
    }
}

fn set_group(group: &[SharedMotor], power: f64) {
    for motor in group {
        set_motor(motor, power);
    }
}

fn set_motor(motor: &SharedMotor, power: f64) {
    if let Ok(mut motor) = motor.try_borrow_mut() {
        motor.set_power(power);
    } else {
        warn!("Motor busy, dropping power {power}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_cloneable;

    #[derive(Default)]
    struct FakeMotor {
        power: f64,
    }

    impl MotorOutput for FakeMotor {
        fn set_power(&mut self, power: f64) { self.power = power; }
    }

    fn motors(n: usize) -> Vec<Rc<RefCell<FakeMotor>>> {
        (0..n).map(|_| make_cloneable(FakeMotor::default())).collect()
    }

    fn shared(motors: &[Rc<RefCell<FakeMotor>>]) -> Vec<SharedMotor> {
        motors.iter().map(|m| m.clone() as SharedMotor).collect()
    }

    #[test]
    fn arcade_mixes_and_clamps() {
        let (left, right) = (motors(2), motors(2));
        let mut dt = Differential::new(shared(&left), shared(&right));

        dt.arcade(0.5, 0.25);
        assert!(left.iter().all(|m| (m.borrow().power - 0.75).abs() < 1e-9));
        assert!(right.iter().all(|m| (m.borrow().power - 0.25).abs() < 1e-9));

        dt.arcade(1.0, 0.5);
        assert!((left[0].borrow().power - 1.0).abs() < 1e-9);
        assert!((right[0].borrow().power - 0.5).abs() < 1e-9);
    }

    #[test]
    fn differential_stop_zeroes_motors() {
        let (left, right) = (motors(1), motors(1));
        let mut dt = Differential::new(shared(&left), shared(&right));
        dt.tank(0.4, -0.4);
        dt.stop();
        assert_eq!(left[0].borrow().power, 0.0);
        assert_eq!(right[0].borrow().power, 0.0);
    }

    #[test]
    fn differential_ignores_strafe() {
        let (left, right) = (motors(1), motors(1));
        let mut dt = Differential::new(shared(&left), shared(&right));
        dt.holonomic(0.7, 0.2, 0.0);
        assert!((left[0].borrow().power - 0.2).abs() < 1e-9);
        assert!((right[0].borrow().power - 0.2).abs() < 1e-9);
    }

    #[test]
    fn mecanum_strafes_and_normalizes() {
        let wheels = motors(4);
        let mut dt = Mecanum::new(
            wheels[0].clone(),
            wheels[1].clone(),
            wheels[2].clone(),
            wheels[3].clone(),
        );

        dt.holonomic(0.5, 0.0, 0.0);
        let p: Vec<f64> = wheels.iter().map(|m| m.borrow().power).collect();
        assert_eq!(p, vec![0.5, -0.5, -0.5, 0.5]);

        dt.holonomic(1.0, 1.0, 0.0);
        let p: Vec<f64> = wheels.iter().map(|m| m.borrow().power).collect();
        assert_eq!(p, vec![1.0, 0.0, 0.0, 1.0]);

        dt.arcade(0.0, 0.3);
        let p: Vec<f64> = wheels.iter().map(|m| m.borrow().power).collect();
        assert!((p[0] - 0.3).abs() < 1e-9 && (p[2] + 0.3).abs() < 1e-9);
    }
}
