use std::error::Error;

// Use rppal in production
#[cfg(not(test))]
use rppal::gpio::{Gpio, OutputPin};
#[cfg(not(test))]
use rppal::pwm::{Channel, Polarity, Pwm};

// Mocks for testing
#[cfg(test)]
use crate::mocks::mock_gpio::{Gpio, OutputPin};
#[cfg(test)]
use crate::mocks::mock_pwm::Pwm;

use crate::config::Config;

/// Standard servo pulse width range (microseconds)
/// Most servos use 1000-2000μs, with 1500μs as center
const SERVO_MIN_PULSE_US: f64 = 1000.0;
const SERVO_MAX_PULSE_US: f64 = 2000.0;

/// Standard servo PWM frequency (Hz)
const SERVO_FREQUENCY_HZ: f64 = 50.0;

/// Full travel of the rudder servo (degrees); 90 is straight ahead.
const SERVO_RANGE_DEGREES: f64 = 180.0;

/// Drive motor PWM frequency (Hz)
#[cfg(not(test))]
const MOTOR_FREQUENCY_HZ: f64 = 1000.0;

/// Motor commands arrive as 8-bit duty values.
const DUTY_SCALE: f64 = 255.0;

#[cfg(not(test))]
fn pwm_channel(pin: u8) -> Result<Channel, Box<dyn Error>> {
    match pin {
        12 | 18 => Ok(Channel::Pwm0),
        13 | 19 => Ok(Channel::Pwm1),
        _ => Err("Invalid PWM pin. Use 12, 13, 18, or 19".into()),
    }
}

/// Steering servo on a hardware PWM channel. Angles are degrees in
/// [0, 180] and map linearly onto the pulse width range.
pub struct RudderServo {
    pwm: Pwm,
}

impl RudderServo {
    pub fn new(cfg: &Config) -> Result<Self, Box<dyn Error>> {
        #[cfg(not(test))]
        let pwm = Pwm::with_frequency(
            pwm_channel(cfg.servo_pin)?,
            SERVO_FREQUENCY_HZ,
            pulse_to_duty(SERVO_MIN_PULSE_US + (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) / 2.0),
            Polarity::Normal,
            true, // enabled
        )?;

        #[cfg(test)]
        let pwm = Pwm::new(cfg.servo_pin)?;

        Ok(Self { pwm })
    }

    /// Drive the servo to `angle` degrees. Out-of-range angles are clamped
    /// to the physical travel.
    pub fn set_angle(&mut self, angle: f64) -> Result<(), Box<dyn Error>> {
        let clamped = angle.clamp(0.0, SERVO_RANGE_DEGREES);
        let pulse_us = SERVO_MIN_PULSE_US
            + (clamped / SERVO_RANGE_DEGREES) * (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US);

        self.pwm.set_duty_cycle(pulse_to_duty(pulse_us))?;
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), Box<dyn Error>> {
        self.pwm.disable()?;
        Ok(())
    }
}

impl Drop for RudderServo {
    fn drop(&mut self) {
        // Ensure PWM is disabled when dropped
        let _ = self.disable();
    }
}

/// Convert a servo pulse width to a duty cycle at the servo frequency.
/// Period = 1/50Hz = 20ms = 20000μs
fn pulse_to_duty(pulse_us: f64) -> f64 {
    let period_us = 1_000_000.0 / SERVO_FREQUENCY_HZ;
    pulse_us / period_us
}

/// Drive motor on the second hardware PWM channel. Takes 0-255 duty
/// commands from the speed controller.
pub struct MotorDrive {
    pwm: Pwm,
}

impl MotorDrive {
    pub fn new(cfg: &Config) -> Result<Self, Box<dyn Error>> {
        #[cfg(not(test))]
        let pwm = Pwm::with_frequency(
            pwm_channel(cfg.motor_pin)?,
            MOTOR_FREQUENCY_HZ,
            0.0, // stopped
            Polarity::Normal,
            true, // enabled
        )?;

        #[cfg(test)]
        let pwm = Pwm::new(cfg.motor_pin)?;

        Ok(Self { pwm })
    }

    /// Apply an 8-bit duty value (0 = stopped, 255 = full on).
    pub fn apply_duty(&mut self, duty: f64) -> Result<(), Box<dyn Error>> {
        let clamped = duty.clamp(0.0, DUTY_SCALE);
        self.pwm.set_duty_cycle(clamped / DUTY_SCALE)?;
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), Box<dyn Error>> {
        self.pwm.disable()?;
        Ok(())
    }
}

impl Drop for MotorDrive {
    fn drop(&mut self) {
        let _ = self.disable();
    }
}

/// Obstacle buzzer on a plain GPIO output. The scheduler toggles it on a
/// fixed cadence while a maneuver is in progress.
pub struct Buzzer {
    pin: OutputPin,
    on: bool,
}

impl Buzzer {
    pub fn new(cfg: &Config) -> Result<Self, Box<dyn Error>> {
        let gpio = Gpio::new()?;
        let pin = gpio.get(cfg.buzzer_pin)?.into_output_low();

        Ok(Self { pin, on: false })
    }

    pub fn toggle(&mut self) {
        if self.on {
            self.pin.set_low();
        } else {
            self.pin.set_high();
        }
        self.on = !self.on;
    }

    pub fn off(&mut self) {
        if self.on {
            self.pin.set_low();
            self.on = false;
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
