// Differential-drive kinematics
// Converts a body-frame velocity command (linear, angular) into signed
// per-wheel duty-cycle percentages and a steering-servo angle.

/// Neutral steering angle in degrees (servo centered, wheels straight)
pub const SERVO_CENTER_ANGLE: f64 = 57.0;

/// Steering gain: degrees of servo deflection per rad/s of commanded
/// angular velocity
const SERVO_ANGLE_GAIN: f64 = 20.0;

/// Ensure `value` is between `minimum` and `maximum`.
///
/// Callers must pass `minimum <= maximum`; a reversed range is not detected
/// and the result simply follows the comparison order below.
pub fn clip(value: f64, minimum: f64, maximum: f64) -> f64 {
    if value < minimum {
        minimum
    } else if value > maximum {
        maximum
    } else {
        value
    }
}

/// Per-tick actuation targets derived from the latest velocity command.
///
/// The percentages are signed and unbounded here; they are clipped to
/// [-100, 100] only when applied to a motor channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationTarget {
    pub left_percent: f64,
    pub right_percent: f64,
    pub servo_angle: f64,
}

impl Default for ActuationTarget {
    /// Full stop with the servo centered
    fn default() -> Self {
        Self {
            left_percent: 0.0,
            right_percent: 0.0,
            servo_angle: SERVO_CENTER_ANGLE,
        }
    }
}

/// Convert a velocity command to actuation targets.
///
/// Wheel speeds come from the differential-drive relation: the angular
/// component adds `angular * wheel_base / 2` to one side and subtracts it
/// from the other. Without wheel-speed sensors there is no closed loop, so
/// m/s maps straight to percent of `max_speed`.
///
/// `max_speed` must be nonzero; configuration validation enforces that
/// before the control loop starts.
pub fn twist_to_target(
    linear: f64,
    angular: f64,
    wheel_base: f64,
    max_speed: f64,
) -> ActuationTarget {
    let left_speed = linear - angular * wheel_base / 2.0;
    let right_speed = linear + angular * wheel_base / 2.0;

    ActuationTarget {
        left_percent: 100.0 * left_speed / max_speed,
        right_percent: 100.0 * right_speed / max_speed,
        servo_angle: angular * SERVO_ANGLE_GAIN + SERVO_CENTER_ANGLE,
    }
}
