use std::error::Error;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::vehicle::Vehicle;

/// Last-run gate for one cooperative task. The first check always fires.
pub struct IntervalTimer {
    period: Duration,
    last: Option<Instant>,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    /// True when `period` has elapsed since the last firing; marks the
    /// task as run at `now` when it fires.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.period,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Cooperative tick loop: every pass checks each task's interval gate and
/// runs whatever is due, to completion, on the one control thread. No task
/// blocks past the bounded sensor timeout, so the cadences hold.
pub struct Scheduler {
    control: IntervalTimer,
    rudder: IntervalTimer,
    buzzer: IntervalTimer,
    telemetry: IntervalTimer,
}

impl Scheduler {
    pub fn new(cfg: &Config) -> Self {
        Self {
            control: IntervalTimer::new(cfg.control_interval),
            rudder: IntervalTimer::new(cfg.rudder_interval),
            buzzer: IntervalTimer::new(cfg.buzzer_interval),
            telemetry: IntervalTimer::new(cfg.telemetry_interval),
        }
    }

    /// One pass. While powered: control sweep, rudder easing, and the
    /// buzzer cadence whenever a maneuver is in progress. While unpowered:
    /// the same control cadence drives the rest writes instead. Telemetry
    /// runs either way and forwards whatever the last sample was.
    pub fn tick(&mut self, vehicle: &mut Vehicle, now: Instant) -> Result<(), Box<dyn Error>> {
        if vehicle.power.is_on() {
            if self.control.ready(now) {
                vehicle.control_task(now)?;
            }
            if self.rudder.ready(now) {
                vehicle.rudder_task(now)?;
            }
            if vehicle.steering.is_straight() {
                vehicle.silence_buzzer();
            } else if self.buzzer.ready(now) {
                vehicle.buzzer_task();
            }
        } else if self.control.ready(now) {
            vehicle.rest_task()?;
        }

        if self.telemetry.ready(now) {
            vehicle.telemetry_task();
        }

        Ok(())
    }
}
