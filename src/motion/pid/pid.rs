//! PID controlled drive base.
//!
//! This module provides [`PIDDrive`], which moves a chassis by a relative
//! distance and/or heading change using one PID controller per axis:
//!
//! - **Two axes** (`new`): a forward distance controller reading
//!   [`PIDRole::Drive`] and a heading controller reading [`PIDRole::Turn`].
//! - **Three axes** (`holonomic`): lateral ([`PIDRole::X`]) and forward
//!   ([`PIDRole::Y`]) distance controllers plus the heading controller, for
//!   mecanum bases.
//!
//! # Architecture
//!
//! `PIDDrive` is a [`CoopTask`]. Every action cycle while a movement is in
//! progress it:
//! 1. Checks for completion (all axes on target, or the deadline passed).
//! 2. Reads each axis' input and computes its PID output.
//! 3. Sends one combined arcade or holonomic command to the drive base.
//!
//! # Turn-only Movements
//!
//! A target whose translation setpoints are exactly `0.0` with a non-zero
//! heading change is a turn in place: only the heading controller decides
//! when the movement is done. A combined move that happens to ask for zero
//! translation is treated the same way.
//!
//! # Usage
//!
//! ```ignore
//! use oceanus::motion::pid::pid::PIDDrive;
//!
//! let pid_drive = make_cloneable(PIDDrive::new(
//!     drivetrain, drive_ctrl, turn_ctrl, sensors, DriveMode::Arcade, clock,
//! ));
//! tasks.register(pid_drive.clone(), TaskFlags::STOP | TaskFlags::ACTION);
//!
//! pid_drive.borrow_mut().set_target(48.0, 0.0, true, Some(done.clone()), 4000);  // 48 inches forward
//! pid_drive.borrow_mut().set_target(0.0, 90.0, true, Some(done.clone()), 2000);  // turn 90 degrees right
//! ```

use std::{cell::RefCell, rc::Rc};

use log::{debug, info, warn};

use super::{PIDInput, PIDRole, ctrl::PIDController};
use crate::{
    drivetrain::{DriveMode, DriveOutput},
    event::Event,
    task::{CoopTask, RunMode},
    time::SharedClock,
};

/// The translation controllers of a [`PIDDrive`].
enum Translation {
    /// Forward distance only.
    Forward(PIDController),
    /// Lateral and forward distance.
    Holonomic { x: PIDController, y: PIDController },
}

/// The PID Drive Controller.
///
/// Create one per drive base and register it with the task manager for
/// `STOP | ACTION`.
pub struct PIDDrive {
    drive:          Rc<RefCell<dyn DriveOutput>>,
    translation:    Translation,
    turn:           PIDController,
    input:          Rc<RefCell<dyn PIDInput>>,
    mode:           DriveMode,
    clock:          SharedClock,
    active:         bool,
    stop_on_target: bool,
    turn_only:      bool,
    notify:         Option<Event>,
    expired_time:   Option<u64>,
}

impl PIDDrive {
    /// Creates a two-axis drive controller.
    ///
    /// # Arguments
    ///
    /// * `drive` - The drive base to command.
    /// * `drive_ctrl` - Controller for forward distance.
    /// * `turn_ctrl` - Controller for heading.
    /// * `input` - Sensor source answering [`PIDRole::Drive`] and [`PIDRole::Turn`].
    /// * `mode` - Whether commands go out as arcade or holonomic commands.
    /// * `clock` - Time source for deadlines.
    pub fn new(
        drive: Rc<RefCell<dyn DriveOutput>>,
        drive_ctrl: PIDController,
        turn_ctrl: PIDController,
        input: Rc<RefCell<dyn PIDInput>>,
        mode: DriveMode,
        clock: SharedClock,
    ) -> Self {
        Self::with_translation(
            drive,
            Translation::Forward(drive_ctrl),
            turn_ctrl,
            input,
            mode,
            clock,
        )
    }

    /// Creates a three-axis drive controller for a holonomic base.
    ///
    /// The input must answer [`PIDRole::X`], [`PIDRole::Y`] and [`PIDRole::Turn`].
    pub fn holonomic(
        drive: Rc<RefCell<dyn DriveOutput>>,
        x_ctrl: PIDController,
        y_ctrl: PIDController,
        turn_ctrl: PIDController,
        input: Rc<RefCell<dyn PIDInput>>,
        clock: SharedClock,
    ) -> Self {
        Self::with_translation(
            drive,
            Translation::Holonomic {
                x: x_ctrl,
                y: y_ctrl,
            },
            turn_ctrl,
            input,
            DriveMode::Mecanum,
            clock,
        )
    }

    fn with_translation(
        drive: Rc<RefCell<dyn DriveOutput>>,
        translation: Translation,
        turn: PIDController,
        input: Rc<RefCell<dyn PIDInput>>,
        mode: DriveMode,
        clock: SharedClock,
    ) -> Self {
        Self {
            drive,
            translation,
            turn,
            input,
            mode,
            clock,
            active: false,
            stop_on_target: false,
            turn_only: false,
            notify: None,
            expired_time: None,
        }
    }

    /// Sets a forward distance and heading target.
    ///
    /// # Arguments
    ///
    /// * `distance` - Forward distance relative to the current position.
    /// * `angle` - Heading change relative to the current heading.
    /// * `stop_on_target` - Stop the drive once on target. Otherwise keep
    ///   correcting until [`stop`](Self::stop) is called.
    /// * `notify` - Event signaled when the movement completes or times out.
    /// * `timeout` - Timeout in milliseconds. `0` means no timeout.
    pub fn set_target(
        &mut self,
        distance: f64,
        angle: f64,
        stop_on_target: bool,
        notify: Option<Event>,
        timeout: u64,
    ) {
        self.set_target_xy(0.0, distance, angle, stop_on_target, notify, timeout);
    }

    /// Sets a lateral distance, forward distance and heading target.
    ///
    /// On a two-axis drive the lateral distance is ignored.
    pub fn set_target_xy(
        &mut self,
        x: f64,
        y: f64,
        angle: f64,
        stop_on_target: bool,
        notify: Option<Event>,
        timeout: u64,
    ) {
        let x = {
            let mut input = match self.input.try_borrow_mut() {
                Ok(input) => input,
                Err(e) => {
                    warn!("PIDDrive input unavailable, target ignored: {e}");
                    return;
                }
            };
            let x = match &mut self.translation {
                Translation::Forward(drive) => {
                    if x != 0.0 {
                        warn!("Two-axis PIDDrive ignoring lateral target {x}");
                    }
                    drive.set_target(y, input.input(PIDRole::Drive));
                    0.0
                }
                Translation::Holonomic { x: x_ctrl, y: y_ctrl } => {
                    x_ctrl.set_target(x, input.input(PIDRole::X));
                    y_ctrl.set_target(y, input.input(PIDRole::Y));
                    x
                }
            };
            self.turn.set_target(angle, input.input(PIDRole::Turn));
            x
        };

        self.notify = notify;
        self.expired_time = (timeout != 0).then(|| self.clock.millis().saturating_add(timeout));
        self.stop_on_target = stop_on_target;
        self.turn_only = x == 0.0 && y == 0.0 && angle != 0.0;
        self.active = true;
        info!(
            "PIDDrive target set: x={x}, y={y}, angle={angle}, turn_only={}, timeout={timeout} ms",
            self.turn_only
        );
    }

    /// Stops the drive base and cancels the current movement.
    pub fn stop(&mut self) {
        self.send_stop();
        match &mut self.translation {
            Translation::Forward(drive) => drive.reset(),
            Translation::Holonomic { x, y } => {
                x.reset();
                y.reset();
            }
        }
        self.turn.reset();
        self.active = false;
    }

    /// Returns `true` while a movement is in progress.
    pub fn is_active(&self) -> bool { self.active }

    /// Returns `true` if the current target is a turn in place.
    pub fn is_turn_only(&self) -> bool { self.turn_only }

    /// The heading controller.
    pub fn turn_ctrl(&self) -> &PIDController { &self.turn }

    /// The forward distance controller (the `y` controller on a holonomic drive).
    pub fn drive_ctrl(&self) -> &PIDController {
        match &self.translation {
            Translation::Forward(drive) => drive,
            Translation::Holonomic { y, .. } => y,
        }
    }

    /// The lateral distance controller, on a holonomic drive.
    pub fn x_ctrl(&self) -> Option<&PIDController> {
        match &self.translation {
            Translation::Forward(_) => None,
            Translation::Holonomic { x, .. } => Some(x),
        }
    }

    fn on_target(&mut self) -> bool {
        if !self.turn.on_target() {
            return false;
        }
        if self.turn_only {
            return true;
        }
        match &mut self.translation {
            Translation::Forward(drive) => drive.on_target(),
            Translation::Holonomic { x, y } => x.on_target() && y.on_target(),
        }
    }

    fn expired(&self) -> bool {
        self.expired_time
            .is_some_and(|deadline| self.clock.millis() >= deadline)
    }

    fn send_stop(&self) {
        if let Ok(mut drive) = self.drive.try_borrow_mut() {
            drive.stop_mode(self.mode);
        } else {
            warn!("Drive base busy, stop dropped");
        }
    }

    /// Updates every controller. While `hold` is set the drive gets a neutral
    /// command instead of the outputs.
    fn send_outputs(&mut self, hold: bool) {
        let (x, y, turn) = {
            let mut input = match self.input.try_borrow_mut() {
                Ok(input) => input,
                Err(e) => {
                    warn!("PIDDrive input unavailable: {e}");
                    return;
                }
            };
            let (x, y) = match &mut self.translation {
                Translation::Forward(drive) => (0.0, drive.calc_output(input.input(PIDRole::Drive))),
                Translation::Holonomic { x, y } => (
                    x.calc_output(input.input(PIDRole::X)),
                    y.calc_output(input.input(PIDRole::Y)),
                ),
            };
            (x, y, self.turn.calc_output(input.input(PIDRole::Turn)))
        };

        if hold {
            self.send_stop();
        } else if let Ok(mut drive) = self.drive.try_borrow_mut() {
            drive.drive(self.mode, x, y, turn);
            debug!("PIDDrive output: x={x}, y={y}, turn={turn}");
        } else {
            warn!("Drive base busy, dropping output");
        }
    }
}

impl CoopTask for PIDDrive {
    fn stop_task(&mut self, _mode: RunMode) { self.stop(); }

    fn process_action(&mut self, _mode: RunMode) {
        if !self.active {
            return;
        }

        let on_target = self.on_target();
        let expired = self.expired();
        if expired || (on_target && self.stop_on_target) {
            info!(
                "PIDDrive {} (drive error {}, turn error {})",
                if expired { "timed out" } else { "on target" },
                self.drive_ctrl().error(),
                self.turn.error()
            );
            self.stop();
            if let Some(event) = &self.notify {
                event.signal();
            }
        } else {
            self.send_outputs(on_target);
        }
    }
}
