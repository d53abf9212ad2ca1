// GPIO software PWM actuation backend
//
// The control core only ever needs "set this named output to N percent
// duty", so that capability is a trait and the rppal-backed implementation
// lives here. Tests substitute a recording mock.

use rppal::gpio::{Gpio, OutputPin};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PwmError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

pub type Result<T> = std::result::Result<T, PwmError>;

/// A single PWM output channel.
///
/// `set_duty_cycle` takes a percentage in [0, 100], implicitly enables the
/// output, and may be called repeatedly; every call re-applies the duty.
pub trait PwmOutput {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<()>;
}

/// Software-PWM output on a BCM GPIO pin.
///
/// The pin is claimed exclusively at construction and released (and driven
/// low) when dropped.
pub struct SoftPwmPin {
    pin: OutputPin,
    frequency_hz: f64,
}

impl SoftPwmPin {
    pub fn new(gpio: &Gpio, pin: u8, frequency_hz: f64) -> Result<Self> {
        let pin = gpio.get(pin)?.into_output_low();
        Ok(Self { pin, frequency_hz })
    }
}

impl PwmOutput for SoftPwmPin {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<()> {
        self.pin
            .set_pwm_frequency(self.frequency_hz, percent / 100.0)?;
        Ok(())
    }
}
