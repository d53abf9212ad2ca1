// Motor control module for the rover drive base
//
// Provides:
// - Differential-drive kinematics (velocity command -> wheel duty percentages)
// - GPIO software PWM actuation backend
// - Bidirectional motor and steering-servo channels

mod driver;
pub mod kinematics;
pub mod pwm;

pub use driver::{Motor, Servo};
pub use kinematics::{ActuationTarget, clip, twist_to_target};
pub use pwm::{PwmError, PwmOutput, SoftPwmPin};
