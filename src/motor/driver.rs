// Motor and servo channels
//
// A `Motor` drives one wheel bidirectionally through two PWM outputs (the
// H-bridge has one input per direction). A `Servo` steers the camera mount
// through a single PWM output.

use tracing::warn;

use super::kinematics::clip;
use super::pwm::{PwmOutput, Result};

// Servo transfer function calibration. Angles map linearly onto the 2-12%
// duty band the servo's pulse-width range expects at 50 Hz.
const SERVO_BASE_DUTY: f64 = 10.0;
const SERVO_ANGLE_SCALE: f64 = 10.0;
const SERVO_DUTY_OFFSET: f64 = 2.0;

/// One bidirectional wheel motor.
pub struct Motor<P: PwmOutput> {
    forward: P,
    backward: P,
}

impl<P: PwmOutput> Motor<P> {
    pub fn new(forward: P, backward: P) -> Self {
        Self { forward, backward }
    }

    /// Drive at a signed percentage of full speed.
    ///
    /// The magnitude is clipped to [0, 100], so callers may pass raw
    /// kinematics output. Both channels are written on every call, even
    /// when nothing changed; the failsafe path relies on `drive(0.0)`
    /// forcing a stop without knowing any prior state. Zero takes the
    /// forward branch.
    pub fn drive(&mut self, speed_percent: f64) -> Result<()> {
        let duty = clip(speed_percent.abs(), 0.0, 100.0);

        if speed_percent < 0.0 {
            self.backward.set_duty_cycle(duty)?;
            self.forward.set_duty_cycle(0.0)?;
        } else {
            self.forward.set_duty_cycle(duty)?;
            self.backward.set_duty_cycle(0.0)?;
        }
        Ok(())
    }
}

impl<P: PwmOutput> Drop for Motor<P> {
    fn drop(&mut self) {
        // Leave the wheel stopped rather than at the last commanded duty
        if let Err(e) = self.drive(0.0) {
            warn!("Failed to stop motor on drop: {}", e);
        }
    }
}

/// Single-axis steering servo.
pub struct Servo<P: PwmOutput> {
    pin: P,
}

impl<P: PwmOutput> Servo<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Steer to the given angle in degrees.
    ///
    /// The resulting duty is deliberately not clipped: the calibrated
    /// transfer function is trusted end to end, and the commanded angles
    /// all come from the bounded kinematics gain. An out-of-band angle
    /// therefore produces an out-of-band duty.
    pub fn turn(&mut self, angle: f64) -> Result<()> {
        let duty = SERVO_BASE_DUTY - ((angle / SERVO_ANGLE_SCALE) - SERVO_DUTY_OFFSET);
        self.pin.set_duty_cycle(duty)
    }
}
