//! Line sensor arrays.
//!
//! A [`SensorArray`] reports which of its sensors currently see the line as a
//! bit pattern (`raw_value`) and turns that pattern into a signed position
//! error (`mapped_value`) a PID controller can close the loop on.
//!
//! [`LightSensorArray`] is the classic three-sensor bar: left, center and
//! right reflectance sensors, with the left sensor in the most significant
//! bit.
//!
//! | raw   | sensors seeing the line | mapped |
//! |-------|-------------------------|--------|
//! | `000` | none                    | held   |
//! | `001` | right                   | -2.0   |
//! | `010` | center                  | 0.0    |
//! | `011` | center + right          | -1.0   |
//! | `100` | left                    | 2.0    |
//! | `101` | left + right (Y fork)   | held   |
//! | `110` | left + center           | 1.0    |
//! | `111` | all (T crossing)        | held   |
//!
//! Patterns without a meaningful position keep the last valid value.

use log::trace;

/// A digital (on/off) sensor.
pub trait DigitalInput {
    /// Returns `true` while the sensor sees the line.
    fn get(&mut self) -> bool;
}

impl<F: FnMut() -> bool> DigitalInput for F {
    fn get(&mut self) -> bool { self() }
}

/// A line sensor array.
pub trait SensorArray {
    /// The raw bit pattern of the sensors seeing the line. `0` means the line
    /// is lost.
    fn raw_value(&mut self) -> u32;

    /// The position of the line relative to the array center for a raw
    /// pattern read with [`raw_value`](SensorArray::raw_value).
    fn mapped_value(&mut self, raw: u32) -> f64;
}

/// Marks a table entry without a position.
const HOLD: f64 = 10.0;

const LIGHT_TABLE: [f64; 8] = [HOLD, -2.0, 0.0, -1.0, 2.0, HOLD, 1.0, HOLD];

/// Three digital light sensors mounted side by side.
pub struct LightSensorArray {
    left:       Box<dyn DigitalInput>,
    center:     Box<dyn DigitalInput>,
    right:      Box<dyn DigitalInput>,
    prev_value: f64,
}

impl LightSensorArray {
    pub fn new(
        left: impl DigitalInput + 'static,
        center: impl DigitalInput + 'static,
        right: impl DigitalInput + 'static,
    ) -> Self {
        Self {
            left:       Box::new(left),
            center:     Box::new(center),
            right:      Box::new(right),
            prev_value: 0.0,
        }
    }
}

impl SensorArray for LightSensorArray {
    fn raw_value(&mut self) -> u32 {
        let raw = (u32::from(self.left.get()) << 2) |
            (u32::from(self.center.get()) << 1) |
            u32::from(self.right.get());
        trace!("Light sensors: {raw:03b}");
        raw
    }

    /// Patterns without a position map to the previous value.
    fn mapped_value(&mut self, raw: u32) -> f64 {
        let value = LIGHT_TABLE.get(raw as usize).copied().unwrap_or(HOLD);
        if value == HOLD {
            self.prev_value
        } else {
            self.prev_value = value;
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    fn array(pattern: Rc<Cell<u32>>) -> LightSensorArray {
        let (l, c, r) = (pattern.clone(), pattern.clone(), pattern);
        LightSensorArray::new(
            move || l.get() & 0b100 != 0,
            move || c.get() & 0b010 != 0,
            move || r.get() & 0b001 != 0,
        )
    }

    fn read(sensors: &mut LightSensorArray) -> f64 {
        let raw = sensors.raw_value();
        sensors.mapped_value(raw)
    }

    #[test]
    fn raw_value_packs_left_to_right() {
        let pattern = Rc::new(Cell::new(0));
        let mut sensors = array(pattern.clone());
        for raw in 0..8 {
            pattern.set(raw);
            assert_eq!(sensors.raw_value(), raw);
        }
    }

    #[test]
    fn positions_follow_the_table() {
        let pattern = Rc::new(Cell::new(0));
        let mut sensors = array(pattern.clone());
        for (raw, expected) in [
            (0b001, -2.0),
            (0b010, 0.0),
            (0b011, -1.0),
            (0b100, 2.0),
            (0b110, 1.0),
        ] {
            pattern.set(raw);
            assert_eq!(read(&mut sensors), expected);
        }
    }

    #[test]
    fn lost_line_keeps_previous_value() {
        let pattern = Rc::new(Cell::new(0b010));
        let mut sensors = array(pattern.clone());
        assert_eq!(read(&mut sensors), 0.0);
        pattern.set(0b000);
        assert_eq!(read(&mut sensors), 0.0);

        pattern.set(0b100);
        assert_eq!(read(&mut sensors), 2.0);
        pattern.set(0b000);
        assert_eq!(read(&mut sensors), 2.0);
    }

    #[test]
    fn forks_and_crossings_keep_previous_value() {
        let pattern = Rc::new(Cell::new(0b011));
        let mut sensors = array(pattern.clone());
        assert_eq!(read(&mut sensors), -1.0);
        pattern.set(0b101);
        assert_eq!(read(&mut sensors), -1.0);
        pattern.set(0b111);
        assert_eq!(read(&mut sensors), -1.0);
    }

    #[test]
    fn held_value_starts_at_zero() {
        let pattern = Rc::new(Cell::new(0b111));
        let mut sensors = array(pattern);
        assert_eq!(read(&mut sensors), 0.0);
    }
}
