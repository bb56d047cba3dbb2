//! Line following.
//!
//! - `sensors`: the [`SensorArray`] abstraction and the three-sensor
//!   [`LightSensorArray`].
//! - `follower`: the [`LineFollower`] subsystem steering a drive base along
//!   the line.

pub mod follower;
pub mod sensors;

pub use follower::LineFollower;
pub use sensors::{DigitalInput, LightSensorArray, SensorArray};
