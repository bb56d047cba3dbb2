use std::{cell::RefCell, rc::Rc};

use log::{debug, info, warn};

use super::sensors::SensorArray;
use crate::{
    drivetrain::{DriveMode, DriveOutput},
    event::Event,
    motion::pid::{PIDOptions, ctrl::PIDController},
    task::{CoopTask, RunMode},
    time::SharedClock,
};

/// **The Line Follower**
///
/// Steers a drive base along a line seen by a [`SensorArray`]. Every action
/// cycle one of three things happens:
///
/// 1. The raw pattern matches the stop pattern, or the deadline passed: the
///    drive stops and the completion event fires.
/// 2. The line is seen: the mapped position goes through the PID controller
///    to give the turn power, and the drive power shrinks as the turn grows.
/// 3. The line is lost: the find-line drive and turn powers are sent as-is.
///
/// The controller always works with absolute setpoints: the target is the
/// mapped value of a centered line.
///
/// # Examples
///
/// ```ignore
/// use oceanus::motion::linefollow::{LightSensorArray, LineFollower};
///
/// let follower = make_cloneable(LineFollower::new(
///     drivetrain, pid_ctrl, make_cloneable(light_bar), DriveMode::Arcade, clock,
/// ));
/// tasks.register(follower.clone(), TaskFlags::STOP | TaskFlags::ACTION);
///
/// // Follow until the T crossing, sweeping right when the line is lost.
/// follower.borrow_mut().start(0.0, Some(0b111), 0.6, 0.2, 0.3, Some(done.clone()), 5000);
/// ```
pub struct LineFollower {
    drive:        Rc<RefCell<dyn DriveOutput>>,
    pid_ctrl:     PIDController,
    sensors:      Rc<RefCell<dyn SensorArray>>,
    mode:         DriveMode,
    clock:        SharedClock,
    active:       bool,
    stop_pattern: Option<u32>,
    max_power:    f64,
    find_drive:   f64,
    find_turn:    f64,
    notify:       Option<Event>,
    expired_time: Option<u64>,
}

impl LineFollower {
    pub fn new(
        drive: Rc<RefCell<dyn DriveOutput>>,
        mut pid_ctrl: PIDController,
        sensors: Rc<RefCell<dyn SensorArray>>,
        mode: DriveMode,
        clock: SharedClock,
    ) -> Self {
        pid_ctrl.set_options(PIDOptions {
            absolute_setpoint: true,
            ..pid_ctrl.options()
        });
        Self {
            drive,
            pid_ctrl,
            sensors,
            mode,
            clock,
            active: false,
            stop_pattern: None,
            max_power: 0.0,
            find_drive: 0.0,
            find_turn: 0.0,
            notify: None,
            expired_time: None,
        }
    }

    /// Starts following the line.
    ///
    /// # Arguments
    ///
    /// * `center` - Mapped value of a centered line.
    /// * `stop_pattern` - Raw pattern that ends the run. `None` never stops on
    ///   a pattern.
    /// * `max_power` - Drive power while centered on the line.
    /// * `find_drive` - Drive power while the line is lost.
    /// * `find_turn` - Turn power while the line is lost.
    /// * `notify` - Event signaled when the run completes or times out.
    /// * `timeout` - Timeout in milliseconds. `0` means no timeout.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        center: f64,
        stop_pattern: Option<u32>,
        max_power: f64,
        find_drive: f64,
        find_turn: f64,
        notify: Option<Event>,
        timeout: u64,
    ) {
        let current = match self.sensors.try_borrow_mut() {
            Ok(mut sensors) => {
                let raw = sensors.raw_value();
                sensors.mapped_value(raw)
            }
            Err(e) => {
                warn!("Line sensors unavailable, follower not started: {e}");
                return;
            }
        };
        self.pid_ctrl.set_target(center, current);
        self.stop_pattern = stop_pattern;
        self.max_power = max_power;
        self.find_drive = find_drive;
        self.find_turn = find_turn;
        self.notify = notify;
        self.expired_time = (timeout != 0).then(|| self.clock.millis().saturating_add(timeout));
        self.active = true;
        info!(
            "Line follower started: center={center}, stop={stop_pattern:?}, max={max_power}, timeout={timeout} ms"
        );
    }

    /// Stops the drive base and ends the run.
    pub fn stop(&mut self) {
        self.command(0.0, 0.0, true);
        self.pid_ctrl.reset();
        self.active = false;
    }

    /// Returns `true` while following.
    pub fn is_active(&self) -> bool { self.active }

    pub fn pid_ctrl(&self) -> &PIDController { &self.pid_ctrl }

    fn expired(&self) -> bool {
        self.expired_time
            .is_some_and(|deadline| self.clock.millis() >= deadline)
    }

    fn command(&self, drive: f64, turn: f64, neutral: bool) {
        let Ok(mut base) = self.drive.try_borrow_mut() else {
            warn!("Drive base busy, dropping line follower output");
            return;
        };
        if neutral {
            base.stop_mode(self.mode);
        } else {
            base.drive(self.mode, 0.0, drive, turn);
        }
    }
}

impl CoopTask for LineFollower {
    fn stop_task(&mut self, _mode: RunMode) { self.stop(); }

    fn process_action(&mut self, _mode: RunMode) {
        if !self.active {
            return;
        }

        let (raw, mapped) = {
            let Ok(mut sensors) = self.sensors.try_borrow_mut() else {
                warn!("Line sensors busy, skipping cycle");
                return;
            };
            let raw = sensors.raw_value();
            let mapped = (raw != 0 && self.stop_pattern != Some(raw)).then(|| sensors.mapped_value(raw));
            (raw, mapped)
        };

        if self.stop_pattern == Some(raw) || self.expired() {
            info!(
                "Line follower {} (pattern {raw:03b})",
                if self.stop_pattern == Some(raw) { "reached stop pattern" } else { "timed out" }
            );
            self.stop();
            if let Some(event) = &self.notify {
                event.signal();
            }
        } else if let Some(mapped) = mapped {
            let turn = self.pid_ctrl.calc_output(mapped);
            let drive = (self.max_power * (1.0 - turn.abs())).max(0.0);
            self.command(drive, turn, false);
            debug!("Line follower: mapped={mapped}, drive={drive}, turn={turn}");
        } else {
            self.command(self.find_drive, self.find_turn, false);
            debug!("Line follower searching");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        make_cloneable,
        motion::linefollow::sensors::LightSensorArray,
        time::ManualClock,
    };

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Command {
        Arcade(f64, f64),
        Holonomic(f64, f64, f64),
    }

    #[derive(Default)]
    struct FakeDrive {
        commands: Vec<Command>,
    }

    impl DriveOutput for FakeDrive {
        fn arcade(&mut self, drive: f64, turn: f64) { self.commands.push(Command::Arcade(drive, turn)); }

        fn holonomic(&mut self, x: f64, y: f64, turn: f64) {
            self.commands.push(Command::Holonomic(x, y, turn));
        }
    }

    struct Rig {
        clock:    ManualClock,
        pattern:  Rc<Cell<u32>>,
        drive:    Rc<RefCell<FakeDrive>>,
        follower: LineFollower,
    }

    fn rig(mode: DriveMode) -> Rig {
        let clock = ManualClock::new();
        let pattern = Rc::new(Cell::new(0b010));
        let (l, c, r) = (pattern.clone(), pattern.clone(), pattern.clone());
        let sensors = make_cloneable(LightSensorArray::new(
            move || l.get() & 0b100 != 0,
            move || c.get() & 0b010 != 0,
            move || r.get() & 0b001 != 0,
        ));
        let drive = make_cloneable(FakeDrive::default());
        let ctrl = PIDController::new(0.25, 0.0, 0.0, clock.shared());
        let follower = LineFollower::new(drive.clone(), ctrl, sensors, mode, clock.shared());
        Rig {
            clock,
            pattern,
            drive,
            follower,
        }
    }

    fn last(rig: &Rig) -> Option<Command> { rig.drive.borrow().commands.last().copied() }

    #[test]
    fn centered_line_drives_straight_at_max_power() {
        let mut r = rig(DriveMode::Arcade);
        r.follower.start(0.0, Some(0b111), 0.6, 0.2, 0.3, None, 0);
        assert!(r.follower.pid_ctrl().options().absolute_setpoint);
        assert_eq!(r.follower.pid_ctrl().target(), 0.0);

        r.follower.process_action(RunMode::Autonomous);
        assert_eq!(last(&r), Some(Command::Arcade(0.6, 0.0)));
    }

    #[test]
    fn off_center_line_turns_and_slows() {
        let mut r = rig(DriveMode::Arcade);
        r.follower.start(0.0, None, 0.6, 0.2, 0.3, None, 0);
        r.pattern.set(0b100);
        r.follower.process_action(RunMode::Autonomous);

        let Some(Command::Arcade(drive, turn)) = last(&r) else {
            panic!("expected arcade command");
        };
        assert!((turn + 0.5).abs() < 1e-9);
        assert!((drive - 0.3).abs() < 1e-9);
    }

    #[test]
    fn drive_power_never_goes_negative() {
        let mut r = rig(DriveMode::Arcade);
        r.follower.start(4.0, None, 0.6, 0.2, 0.3, None, 0);
        r.pattern.set(0b001);
        r.follower.process_action(RunMode::Autonomous);
        assert_eq!(last(&r), Some(Command::Arcade(0.0, 1.0)));
    }

    #[test]
    fn lost_line_uses_find_powers() {
        let mut r = rig(DriveMode::Arcade);
        r.follower.start(0.0, Some(0b111), 0.6, 0.2, 0.3, None, 0);
        r.pattern.set(0b000);
        r.follower.process_action(RunMode::Autonomous);
        assert_eq!(last(&r), Some(Command::Arcade(0.2, 0.3)));
        assert!(r.follower.is_active());
    }

    #[test]
    fn stop_pattern_ends_run_once() {
        let mut r = rig(DriveMode::Arcade);
        let done = Event::new();
        r.follower.start(0.0, Some(0b111), 0.6, 0.2, 0.3, Some(done.clone()), 0);
        r.follower.process_action(RunMode::Autonomous);

        r.pattern.set(0b111);
        r.follower.process_action(RunMode::Autonomous);
        assert!(!r.follower.is_active());
        assert!(done.is_signaled());
        assert_eq!(last(&r), Some(Command::Arcade(0.0, 0.0)));

        let count = r.drive.borrow().commands.len();
        r.follower.process_action(RunMode::Autonomous);
        assert_eq!(r.drive.borrow().commands.len(), count);
    }

    #[test]
    fn no_stop_pattern_follows_through_crossings() {
        let mut r = rig(DriveMode::Arcade);
        r.follower.start(0.0, None, 0.6, 0.2, 0.3, None, 0);
        r.pattern.set(0b111);
        r.follower.process_action(RunMode::Autonomous);
        assert!(r.follower.is_active());
        assert_eq!(last(&r), Some(Command::Arcade(0.6, 0.0)));
    }

    #[test]
    fn lost_line_stop_pattern_stops_instead_of_searching() {
        let mut r = rig(DriveMode::Arcade);
        r.follower.start(0.0, Some(0b000), 0.6, 0.2, 0.3, None, 0);
        r.pattern.set(0b000);
        r.follower.process_action(RunMode::Autonomous);
        assert!(!r.follower.is_active());
    }

    #[test]
    fn times_out() {
        let mut r = rig(DriveMode::Arcade);
        let done = Event::new();
        r.follower.start(0.0, None, 0.6, 0.2, 0.3, Some(done.clone()), 500);
        r.clock.advance(500);
        r.follower.process_action(RunMode::Autonomous);
        assert!(!r.follower.is_active());
        assert!(done.is_signaled());
    }

    #[test]
    fn huge_timeout_never_expires_early() {
        let mut r = rig(DriveMode::Arcade);
        r.clock.set(1000);
        r.follower.start(0.0, None, 0.6, 0.2, 0.3, None, u64::MAX);
        r.follower.process_action(RunMode::Autonomous);
        r.clock.advance(60_000);
        r.follower.process_action(RunMode::Autonomous);
        assert!(r.follower.is_active());
    }

    #[test]
    fn mecanum_mode_sends_holonomic_commands() {
        let mut r = rig(DriveMode::Mecanum);
        r.follower.start(0.0, None, 0.6, 0.2, 0.3, None, 0);
        r.pattern.set(0b000);
        r.follower.process_action(RunMode::Autonomous);
        assert_eq!(last(&r), Some(Command::Holonomic(0.0, 0.2, 0.3)));
    }
}
