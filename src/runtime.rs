// Fixed-rate control loop with watchdog
//
// Two things happen concurrently from the vehicle's point of view: commands
// arrive whenever the commander feels like it, and actuation happens at a
// fixed rate. Both are multiplexed onto the tick loop below; pending
// commands are drained non-blocking at the top of each tick, so a tick can
// never observe a half-written command. If commands stop arriving the
// watchdog stops the vehicle; that is the designed response to losing the
// commander, not an error path.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{
    DriverConfig, FAILSAFE_SERVO_ANGLE, MOTOR_PWM_HZ, SERVO_PWM_HZ, TOPIC_CMD_VEL, TOPIC_HEALTH,
};
use crate::messages::{DriverHealth, Twist};
use crate::motor::pwm::Result as PwmResult;
use crate::motor::{ActuationTarget, Motor, PwmOutput, Servo, SoftPwmPin, twist_to_target};

/// Actuation mode for one tick, recomputed from elapsed time each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Live,
    Failsafe,
}

/// Staleness detector for the command stream.
///
/// Stateless beyond its timeout: the decision is a pure function of the
/// last-received timestamp and the current time.
#[derive(Debug, Clone, Copy)]
pub struct Watchdog {
    timeout: Duration,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn evaluate(&self, last_received: Instant, now: Instant) -> WatchdogState {
        if now.saturating_duration_since(last_received) >= self.timeout {
            WatchdogState::Failsafe
        } else {
            WatchdogState::Live
        }
    }
}

/// The control core: owns the five actuation channels, the watchdog, and
/// the latest derived actuation target.
pub struct Driver<P: PwmOutput> {
    left_motor: Motor<P>,
    right_motor: Motor<P>,
    servo: Servo<P>,
    watchdog: Watchdog,
    wheel_base: f64,
    max_speed: f64,
    target: ActuationTarget,
    cmd_received_at: Instant,
    health: DriverHealth,
}

impl<P: PwmOutput> Driver<P> {
    /// The timestamp starts at construction time, so the vehicle runs live
    /// (with the stopped default target) for up to one timeout before the
    /// watchdog can trigger.
    pub fn new(
        left_motor: Motor<P>,
        right_motor: Motor<P>,
        servo: Servo<P>,
        config: &DriverConfig,
    ) -> Self {
        Self {
            left_motor,
            right_motor,
            servo,
            watchdog: Watchdog::new(Duration::from_secs_f64(config.timeout)),
            wheel_base: config.wheel_base,
            max_speed: config.max_speed,
            target: ActuationTarget::default(),
            cmd_received_at: Instant::now(),
            health: DriverHealth::Ok,
        }
    }

    /// Process an incoming velocity command: refresh the watchdog timestamp
    /// and derive the new actuation target right away.
    pub fn on_command(&mut self, cmd: &Twist) {
        info!("Received command: linear={} angular={}", cmd.linear.x, cmd.angular.z);
        self.cmd_received_at = Instant::now();
        self.target = twist_to_target(cmd.linear.x, cmd.angular.z, self.wheel_base, self.max_speed);
    }

    /// Apply one actuation cycle at the given time.
    pub fn tick(&mut self, now: Instant) -> PwmResult<()> {
        match self.watchdog.evaluate(self.cmd_received_at, now) {
            WatchdogState::Live => {
                if self.health == DriverHealth::CmdStale {
                    info!("Command stream live again");
                }
                self.health = DriverHealth::Ok;
                self.left_motor.drive(self.target.left_percent)?;
                self.right_motor.drive(self.target.right_percent)?;
                self.servo.turn(self.target.servo_angle)?;
            }
            WatchdogState::Failsafe => {
                if self.health != DriverHealth::CmdStale {
                    let age = now.saturating_duration_since(self.cmd_received_at);
                    warn!("Command stale ({:?} old), stopping vehicle", age);
                }
                self.health = DriverHealth::CmdStale;
                self.left_motor.drive(0.0)?;
                self.right_motor.drive(0.0)?;
                self.servo.turn(FAILSAFE_SERVO_ANGLE)?;
            }
        }
        Ok(())
    }

    pub fn health(&self) -> DriverHealth {
        self.health
    }
}

pub async fn run(config: DriverConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    info!("Claiming GPIO pins...");
    let gpio = rppal::gpio::Gpio::new()?;
    let left_motor = Motor::new(
        SoftPwmPin::new(&gpio, config.left_forward_pin, MOTOR_PWM_HZ)?,
        SoftPwmPin::new(&gpio, config.left_backward_pin, MOTOR_PWM_HZ)?,
    );
    let right_motor = Motor::new(
        SoftPwmPin::new(&gpio, config.right_forward_pin, MOTOR_PWM_HZ)?,
        SoftPwmPin::new(&gpio, config.right_backward_pin, MOTOR_PWM_HZ)?,
    );
    let servo = Servo::new(SoftPwmPin::new(&gpio, config.servo_pin, SERVO_PWM_HZ)?);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_VEL).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut driver = Driver::new(left_motor, right_motor, servo, &config);
    let mut tick = interval(Duration::from_secs_f64(1.0 / config.rate));

    info!(
        "Driver started: {}Hz loop, {}s watchdog timeout, max_speed={}m/s, wheel_base={}m",
        config.rate, config.timeout, config.max_speed, config.wheel_base
    );
    info!("Subscribed to: {}", TOPIC_CMD_VEL);
    info!("Publishing to: {}", TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<Twist>(&payload) {
                Ok(cmd) => {
                    driver.on_command(&cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Apply actuation (includes watchdog logic)
        driver.tick(Instant::now())?;

        // 3. Publish health
        let health_json = serde_json::to_string(&driver.health())?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::pwm::mock::RecordingPwm;
    use clap::Parser;

    struct Pins {
        left_forward: RecordingPwm,
        left_backward: RecordingPwm,
        right_forward: RecordingPwm,
        right_backward: RecordingPwm,
        servo: RecordingPwm,
    }

    fn test_driver() -> (Driver<RecordingPwm>, Pins) {
        let pins = Pins {
            left_forward: RecordingPwm::new(),
            left_backward: RecordingPwm::new(),
            right_forward: RecordingPwm::new(),
            right_backward: RecordingPwm::new(),
            servo: RecordingPwm::new(),
        };
        let left = Motor::new(pins.left_forward.clone(), pins.left_backward.clone());
        let right = Motor::new(pins.right_forward.clone(), pins.right_backward.clone());
        let servo = Servo::new(pins.servo.clone());

        let config = DriverConfig::parse_from(["rover-drive-runtime"]);
        (Driver::new(left, right, servo, &config), pins)
    }

    fn servo_duty(angle: f64) -> f64 {
        10.0 - ((angle / 10.0) - 2.0)
    }

    #[test]
    fn test_watchdog_boundaries() {
        let watchdog = Watchdog::new(Duration::from_secs(2));
        let t0 = Instant::now();

        assert_eq!(
            watchdog.evaluate(t0, t0 + Duration::from_millis(1900)),
            WatchdogState::Live
        );
        // The boundary itself is already stale
        assert_eq!(
            watchdog.evaluate(t0, t0 + Duration::from_millis(2000)),
            WatchdogState::Failsafe
        );
        assert_eq!(
            watchdog.evaluate(t0, t0 + Duration::from_millis(2100)),
            WatchdogState::Failsafe
        );
    }

    #[test]
    fn test_watchdog_fresh_command_is_live() {
        let watchdog = Watchdog::new(Duration::from_secs(2));
        let t0 = Instant::now();
        assert_eq!(watchdog.evaluate(t0, t0), WatchdogState::Live);
    }

    #[test]
    fn test_startup_grace_applies_stop() {
        // Before any command the driver runs live with the default target:
        // wheels stopped, servo centered
        let (mut driver, pins) = test_driver();
        driver.tick(Instant::now()).unwrap();

        assert_eq!(driver.health(), DriverHealth::Ok);
        assert_eq!(pins.left_forward.last_duty(), Some(0.0));
        assert_eq!(pins.left_backward.last_duty(), Some(0.0));
        assert_eq!(pins.right_forward.last_duty(), Some(0.0));
        assert_eq!(pins.right_backward.last_duty(), Some(0.0));
        assert!((pins.servo.last_duty().unwrap() - servo_duty(57.0)).abs() < 1e-9);
    }

    #[test]
    fn test_live_command_drives_both_wheels() {
        let (mut driver, pins) = test_driver();
        let t0 = Instant::now();

        driver.on_command(&Twist::new(1.0, 0.0));
        driver.tick(t0 + Duration::from_millis(500)).unwrap();

        assert_eq!(driver.health(), DriverHealth::Ok);
        assert_eq!(pins.left_forward.last_duty(), Some(100.0));
        assert_eq!(pins.left_backward.last_duty(), Some(0.0));
        assert_eq!(pins.right_forward.last_duty(), Some(100.0));
        assert_eq!(pins.right_backward.last_duty(), Some(0.0));
        assert!((pins.servo.last_duty().unwrap() - servo_duty(57.0)).abs() < 1e-9);
    }

    #[test]
    fn test_stale_command_triggers_failsafe() {
        let (mut driver, pins) = test_driver();
        let t0 = Instant::now();

        driver.on_command(&Twist::new(1.0, 0.0));
        driver.tick(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(pins.left_forward.last_duty(), Some(100.0));

        // No further commands: past the 2s timeout the vehicle stops and
        // the servo goes to the failsafe angle
        driver.tick(t0 + Duration::from_millis(2600)).unwrap();

        assert_eq!(driver.health(), DriverHealth::CmdStale);
        assert_eq!(pins.left_forward.last_duty(), Some(0.0));
        assert_eq!(pins.left_backward.last_duty(), Some(0.0));
        assert_eq!(pins.right_forward.last_duty(), Some(0.0));
        assert_eq!(pins.right_backward.last_duty(), Some(0.0));
        assert!((pins.servo.last_duty().unwrap() - servo_duty(60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_new_command_recovers_from_failsafe() {
        let (mut driver, pins) = test_driver();
        let t0 = Instant::now();

        driver.on_command(&Twist::new(0.5, 0.0));
        driver.tick(t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(driver.health(), DriverHealth::CmdStale);

        let t1 = Instant::now();
        driver.on_command(&Twist::new(0.5, 0.0));
        driver.tick(t1 + Duration::from_millis(100)).unwrap();

        assert_eq!(driver.health(), DriverHealth::Ok);
        assert_eq!(pins.left_forward.last_duty(), Some(50.0));
        assert_eq!(pins.right_forward.last_duty(), Some(50.0));
    }

    #[test]
    fn test_turn_command_splits_wheels() {
        let (mut driver, pins) = test_driver();
        let t0 = Instant::now();

        driver.on_command(&Twist::new(0.0, 1.0));
        driver.tick(t0 + Duration::from_millis(100)).unwrap();

        // Left wheel reverses, right wheel goes forward, servo deflects
        assert_eq!(pins.left_backward.last_duty(), Some(50.0));
        assert_eq!(pins.left_forward.last_duty(), Some(0.0));
        assert_eq!(pins.right_forward.last_duty(), Some(50.0));
        assert_eq!(pins.right_backward.last_duty(), Some(0.0));
        assert!((pins.servo.last_duty().unwrap() - servo_duty(77.0)).abs() < 1e-9);
    }

    #[test]
    fn test_overspeed_command_clipped_at_wheels() {
        let (mut driver, pins) = test_driver();
        let t0 = Instant::now();

        driver.on_command(&Twist::new(3.0, 0.0));
        driver.tick(t0 + Duration::from_millis(100)).unwrap();

        assert_eq!(pins.left_forward.last_duty(), Some(100.0));
        assert_eq!(pins.right_forward.last_duty(), Some(100.0));
    }

    #[test]
    fn test_latest_command_wins() {
        let (mut driver, pins) = test_driver();
        let t0 = Instant::now();

        driver.on_command(&Twist::new(1.0, 0.0));
        driver.on_command(&Twist::new(-0.5, 0.0));
        driver.tick(t0 + Duration::from_millis(100)).unwrap();

        assert_eq!(pins.left_backward.last_duty(), Some(50.0));
        assert_eq!(pins.left_forward.last_duty(), Some(0.0));
        assert_eq!(pins.right_backward.last_duty(), Some(50.0));
    }
}
