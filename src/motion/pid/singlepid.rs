use std::{cell::RefCell, rc::Rc};

use log::{debug, info, warn};

use super::{PIDInput, PIDRole, ctrl::PIDController};
use crate::{
    drivetrain::MotorOutput,
    event::Event,
    task::{CoopTask, RunMode},
    time::SharedClock,
};

/// **The PID Actuator Controller**
///
/// Drives one motor (a lift winch, an arm) toward a position read from a
/// [`PIDInput`] with [`PIDRole::Actuator`]. Register it with the task manager
/// for `STOP | ACTION`; it updates the motor in
/// [`process_action`](CoopTask::process_action).
///
/// # Examples
///
/// ```ignore
/// use oceanus::motion::pid::singlepid::PIDActuator;
///
/// let lift = make_cloneable(PIDActuator::new(winch, pid_ctrl, encoder, clock));
/// tasks.register(lift.clone(), TaskFlags::STOP | TaskFlags::ACTION);
///
/// // Raise the lift 24 inches, signal `done` when there, give up after 3 s.
/// lift.borrow_mut().set_target(24.0, true, Some(done.clone()), 3000);
/// ```
pub struct PIDActuator {
    motor:          Rc<RefCell<dyn MotorOutput>>,
    pid_ctrl:       PIDController,
    input:          Rc<RefCell<dyn PIDInput>>,
    clock:          SharedClock,
    active:         bool,
    stop_on_target: bool,
    notify:         Option<Event>,
    expired_time:   Option<u64>,
    /// Last successful input reading, reused while the input is borrowed.
    last_input:     f64,
}

impl PIDActuator {
    pub fn new(
        motor: Rc<RefCell<dyn MotorOutput>>,
        pid_ctrl: PIDController,
        input: Rc<RefCell<dyn PIDInput>>,
        clock: SharedClock,
    ) -> Self {
        Self {
            motor,
            pid_ctrl,
            input,
            clock,
            active: false,
            stop_on_target: false,
            notify: None,
            expired_time: None,
            last_input: 0.0,
        }
    }

    /// Sets the target that the motor should move to.
    ///
    /// # Arguments
    ///
    /// * `setpoint` - Target position (relative unless the controller uses
    ///   absolute setpoints).
    /// * `stop_on_target` - Stop the motor once on target. Otherwise keep
    ///   holding the position until [`stop`](Self::stop) is called.
    /// * `notify` - Event signaled when the movement completes or times out.
    /// * `timeout` - Timeout in milliseconds. `0` means no timeout.
    pub fn set_target(
        &mut self,
        setpoint: f64,
        stop_on_target: bool,
        notify: Option<Event>,
        timeout: u64,
    ) {
        let current = self.read_input();
        self.pid_ctrl.set_target(setpoint, current);
        self.notify = notify;
        self.expired_time = (timeout != 0).then(|| self.clock.millis().saturating_add(timeout));
        self.stop_on_target = stop_on_target;
        self.active = true;
        info!(
            "Actuator target set: {} (stop_on_target={stop_on_target}, timeout={timeout} ms)",
            self.pid_ctrl.target()
        );
    }

    /// Stops the motor and cancels the current movement.
    pub fn stop(&mut self) {
        self.set_power(0.0);
        self.pid_ctrl.reset();
        self.active = false;
    }

    /// Returns `true` while a movement is in progress.
    pub fn is_active(&self) -> bool { self.active }

    /// The controller driving this actuator.
    pub fn pid_ctrl(&self) -> &PIDController { &self.pid_ctrl }

    pub fn pid_ctrl_mut(&mut self) -> &mut PIDController { &mut self.pid_ctrl }

    fn expired(&self) -> bool {
        self.expired_time
            .is_some_and(|deadline| self.clock.millis() >= deadline)
    }

    fn read_input(&mut self) -> f64 {
        match self.input.try_borrow_mut() {
            Ok(mut input) => self.last_input = input.input(PIDRole::Actuator),
            Err(e) => warn!("Actuator input unavailable, reusing {}: {e}", self.last_input),
        }
        self.last_input
    }

    fn set_power(&self, power: f64) {
        if let Ok(mut motor) = self.motor.try_borrow_mut() {
            motor.set_power(power);
        } else {
            warn!("Actuator motor busy, dropping power {power}");
        }
    }
}

impl CoopTask for PIDActuator {
    fn stop_task(&mut self, _mode: RunMode) { self.stop(); }

    fn process_action(&mut self, _mode: RunMode) {
        if !self.active {
            return;
        }

        let on_target = self.stop_on_target && self.pid_ctrl.on_target();
        if on_target || self.expired() {
            info!(
                "Actuator {} (error {})",
                if on_target { "on target" } else { "timed out" },
                self.pid_ctrl.error()
            );
            self.stop();
            if let Some(event) = &self.notify {
                event.signal();
            }
        } else {
            let input = self.read_input();
            let output = self.pid_ctrl.calc_output(input);
            self.set_power(output);
            debug!("Actuator output: {output}");
        }
    }
}
