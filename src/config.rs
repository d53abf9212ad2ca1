// Topics, PWM frequencies, and the startup configuration surface

use clap::Parser;
use thiserror::Error;

// Zenoh topics
pub const TOPIC_CMD_VEL: &str = "rover/cmd/vel"; // velocity commands (Twist JSON)
pub const TOPIC_HEALTH: &str = "rover/state/health"; // health status

/// Software PWM frequency for the drive motors (Hz)
pub const MOTOR_PWM_HZ: f64 = 20.0;

/// Software PWM frequency for the steering servo (Hz)
pub const SERVO_PWM_HZ: f64 = 50.0;

/// Servo angle applied while the watchdog holds the vehicle stopped.
/// Distinct from the kinematic center of 57 degrees; kept as calibrated.
pub const FAILSAFE_SERVO_ANGLE: f64 = 60.0;

/// Runtime configuration, read once at startup and immutable afterwards.
///
/// Pin numbers are BCM GPIO numbers. Each motor takes two pins because the
/// H-bridge has no reverse-polarity primitive: one PWM channel per direction.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rover-drive-runtime",
    about = "Differential-drive runtime for a two-wheeled rover"
)]
pub struct DriverConfig {
    /// Watchdog timeout in seconds; the vehicle stops when no command
    /// arrives for this long
    #[arg(long, default_value_t = 2.0)]
    pub timeout: f64,

    /// Control loop rate in Hz
    #[arg(long, default_value_t = 10.0)]
    pub rate: f64,

    /// Wheel speed corresponding to 100% duty cycle (m/s)
    #[arg(long, default_value_t = 1.0)]
    pub max_speed: f64,

    /// Lateral distance between the driven wheels (m)
    #[arg(long, default_value_t = 1.0)]
    pub wheel_base: f64,

    /// GPIO pin for the left motor, forward direction
    #[arg(long, default_value_t = 10)]
    pub left_forward_pin: u8,

    /// GPIO pin for the left motor, backward direction
    #[arg(long, default_value_t = 9)]
    pub left_backward_pin: u8,

    /// GPIO pin for the right motor, forward direction
    #[arg(long, default_value_t = 8)]
    pub right_forward_pin: u8,

    /// GPIO pin for the right motor, backward direction
    #[arg(long, default_value_t = 7)]
    pub right_backward_pin: u8,

    /// GPIO pin for the steering servo
    #[arg(long, default_value_t = 17)]
    pub servo_pin: u8,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_speed must be a positive number, got {0}")]
    InvalidMaxSpeed(f64),

    #[error("rate must be a positive number, got {0}")]
    InvalidRate(f64),

    #[error("timeout must be a non-negative number, got {0}")]
    InvalidTimeout(f64),

    #[error("GPIO pin {0} is assigned to more than one channel")]
    DuplicatePin(u8),
}

impl DriverConfig {
    /// Validate before any hardware is touched. `max_speed` in particular
    /// divides the kinematics output, so a zero here must never reach the
    /// control loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 {
            return Err(ConfigError::InvalidMaxSpeed(self.max_speed));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::InvalidRate(self.rate));
        }
        if !self.timeout.is_finite() || self.timeout < 0.0 {
            return Err(ConfigError::InvalidTimeout(self.timeout));
        }

        let pins = [
            self.left_forward_pin,
            self.left_backward_pin,
            self.right_forward_pin,
            self.right_backward_pin,
            self.servo_pin,
        ];
        for (i, &pin) in pins.iter().enumerate() {
            if pins[..i].contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
        }

        Ok(())
    }
}
