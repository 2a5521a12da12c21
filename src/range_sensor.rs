use std::error::Error;
use std::thread;
use std::time::{Duration, Instant};

// Use rppal in production
#[cfg(not(test))]
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};

// Mock GPIO for testing
#[cfg(test)]
use crate::mocks::mock_gpio::{Gpio, InputPin, Level, OutputPin};

use crate::config::Config;

/// Speed of sound in air, meters per microsecond. The echo travels out and
/// back, so the measured duration covers twice the distance.
const SOUND_SPEED_M_PER_US: f64 = 0.000344;

/// One reading of all three channels. A field holding the configured
/// no-echo distance (999.0 by default) means that channel timed out:
/// nothing in range, not a fault.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub front: f64,
    pub left: f64,
    pub right: f64,
}

impl DistanceSample {
    /// A sample with every channel out of range.
    pub fn out_of_range(no_echo_distance: f64) -> Self {
        Self {
            front: no_echo_distance,
            left: no_echo_distance,
            right: no_echo_distance,
        }
    }
}

struct RangeChannel {
    trigger: OutputPin,
    echo: InputPin,
}

/// Three independent HC-SR04 style trigger/echo channels: front, left, right.
pub struct RangeSensorArray {
    front: RangeChannel,
    left: RangeChannel,
    right: RangeChannel,
    echo_timeout: Duration,
    channel_settle: Duration,
    no_echo_distance: f64,
}

impl RangeSensorArray {
    pub fn new(cfg: &Config) -> Result<Self, Box<dyn Error>> {
        let gpio = Gpio::new()?;

        let open = |i: usize| -> Result<RangeChannel, Box<dyn Error>> {
            Ok(RangeChannel {
                trigger: gpio.get(cfg.trigger_pins[i])?.into_output_low(),
                echo: gpio.get(cfg.echo_pins[i])?.into_input(),
            })
        };

        Ok(Self {
            front: open(0)?,
            left: open(1)?,
            right: open(2)?,
            echo_timeout: cfg.echo_timeout,
            channel_settle: cfg.channel_settle,
            no_echo_distance: cfg.no_echo_distance,
        })
    }

    /// Sample all three channels. The channels fire strictly one after
    /// another with `channel_settle` between them; firing a second
    /// transducer while an echo is still in flight reads back false
    /// echoes, so this serialization is a hard requirement. Worst case the
    /// sweep takes 3 × echo_timeout + 2 × channel_settle (~190 ms with
    /// defaults).
    pub fn sample_all(&mut self) -> DistanceSample {
        let front = Self::measure(&mut self.front, self.echo_timeout, self.no_echo_distance);
        thread::sleep(self.channel_settle);
        let left = Self::measure(&mut self.left, self.echo_timeout, self.no_echo_distance);
        thread::sleep(self.channel_settle);
        let right = Self::measure(&mut self.right, self.echo_timeout, self.no_echo_distance);

        DistanceSample { front, left, right }
    }

    /// Measure one channel. Returns the distance in meters, or
    /// `no_echo_distance` when the echo never came back inside the timeout.
    fn measure(channel: &mut RangeChannel, timeout: Duration, no_echo_distance: f64) -> f64 {
        match Self::echo_pulse_us(channel, timeout) {
            Some(duration_us) => duration_to_distance(duration_us),
            None => no_echo_distance,
        }
    }

    /// Fire the trigger and time the echo line's high pulse, polling
    /// cooperatively (yielding each iteration) so sibling tasks are not
    /// starved. `None` means the pulse did not complete inside `timeout`.
    fn echo_pulse_us(channel: &mut RangeChannel, timeout: Duration) -> Option<f64> {
        // 10 us trigger pulse, edges separated by a brief settle
        channel.trigger.set_low();
        busy_wait_us(2);
        channel.trigger.set_high();
        busy_wait_us(10);
        channel.trigger.set_low();

        let deadline = Instant::now() + timeout;

        while channel.echo.read() == Level::Low {
            if Instant::now() >= deadline {
                return None;
            }
            thread::yield_now();
        }
        let rise = Instant::now();

        while channel.echo.read() == Level::High {
            if Instant::now() >= deadline {
                return None;
            }
            thread::yield_now();
        }

        Some(rise.elapsed().as_secs_f64() * 1_000_000.0)
    }
}

/// Convert an echo high-pulse duration (microseconds) to a one-way
/// distance in meters.
pub fn duration_to_distance(duration_us: f64) -> f64 {
    duration_us * SOUND_SPEED_M_PER_US / 2.0
}

/// thread::sleep granularity is far coarser than the 10 us trigger pulse,
/// so short waits spin on the monotonic clock instead.
fn busy_wait_us(us: u64) {
    let end = Instant::now() + Duration::from_micros(us);
    while Instant::now() < end {
        std::hint::spin_loop();
    }
}
