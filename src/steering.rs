use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::Config;
use crate::range_sensor::DistanceSample;

pub const LABEL_TURNING_LEFT: &str = "Turning Left…";
pub const LABEL_TURNING_RIGHT: &str = "Turning Right…";
pub const LABEL_GOING_STRAIGHT: &str = "Going straight…";

/// Exactly one mode is active at any time. Transitions are edge-triggered
/// on distance-threshold crossings and elapsed time, never on external
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringMode {
    Straight,
    Avoiding,
    Returning,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Turn {
    Left,
    Right,
}

/// Decides left-or-right when both sides read exactly the same distance.
/// Injectable so steering is deterministic under a fixed seed.
pub trait TieBreak: Send {
    fn choose(&mut self) -> Turn;
}

/// Uniformly random tie-break, the production strategy.
pub struct UniformTieBreak {
    rng: StdRng,
}

impl UniformTieBreak {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformTieBreak {
    fn default() -> Self {
        Self::new()
    }
}

impl TieBreak for UniformTieBreak {
    fn choose(&mut self) -> Turn {
        if self.rng.gen_bool(0.5) {
            Turn::Left
        } else {
            Turn::Right
        }
    }
}

/// Current rudder angle, the angle it is easing toward, and the
/// human-readable direction label reported over telemetry.
#[derive(Debug, Clone, Copy)]
pub struct RudderState {
    pub angle: f64,
    pub target: f64,
    pub direction: &'static str,
}

/// Obstacle-avoidance state machine. `evaluate` runs once per sensor sweep
/// and handles mode transitions; `update_rudder` runs on the faster rudder
/// cadence and eases the angle toward its target.
pub struct SteeringController {
    mode: SteeringMode,
    rudder: RudderState,
    /// When the front last rose clear of the threshold; the rudder holds
    /// position for `return_delay` past this before seeking center.
    cleared_at: Option<Instant>,
    tie_break: Box<dyn TieBreak>,

    front_threshold_m: f64,
    left_angle: f64,
    right_angle: f64,
    center_angle: f64,
    rudder_gain: f64,
    center_tolerance: f64,
    return_delay: Duration,
    avoid_rpm: f64,
    cruise_rpm: f64,
}

impl SteeringController {
    pub fn new(cfg: &Config) -> Self {
        Self::with_tie_break(cfg, Box::new(UniformTieBreak::new()))
    }

    pub fn with_tie_break(cfg: &Config, tie_break: Box<dyn TieBreak>) -> Self {
        Self {
            mode: SteeringMode::Straight,
            rudder: RudderState {
                angle: cfg.center_angle,
                target: cfg.center_angle,
                direction: LABEL_GOING_STRAIGHT,
            },
            cleared_at: None,
            tie_break,
            front_threshold_m: cfg.front_threshold_m,
            left_angle: cfg.left_angle,
            right_angle: cfg.right_angle,
            center_angle: cfg.center_angle,
            rudder_gain: cfg.rudder_gain,
            center_tolerance: cfg.center_tolerance,
            return_delay: cfg.return_delay,
            avoid_rpm: cfg.avoid_rpm,
            cruise_rpm: cfg.cruise_rpm,
        }
    }

    pub fn mode(&self) -> SteeringMode {
        self.mode
    }

    pub fn rudder(&self) -> &RudderState {
        &self.rudder
    }

    pub fn is_straight(&self) -> bool {
        self.mode == SteeringMode::Straight
    }

    /// RPM setpoint implied by the current mode: slow down through the
    /// maneuver, cruise otherwise.
    pub fn desired_rpm(&self) -> f64 {
        match self.mode {
            SteeringMode::Avoiding => self.avoid_rpm,
            _ => self.cruise_rpm,
        }
    }

    /// Mode transitions, evaluated once per sensor sweep.
    pub fn evaluate(&mut self, sample: &DistanceSample, now: Instant) {
        match self.mode {
            SteeringMode::Straight => {
                if sample.front <= self.front_threshold_m {
                    self.mode = SteeringMode::Avoiding;
                    self.cleared_at = None;
                }
            }
            SteeringMode::Avoiding => {
                if sample.front > self.front_threshold_m {
                    self.mode = SteeringMode::Returning;
                    self.cleared_at = Some(now);
                }
            }
            // Returning ends only by reaching center, in update_rudder.
            SteeringMode::Returning => {}
        }
    }

    /// One rudder-cadence step: pick the target for the current mode and
    /// ease the angle toward it. Returns the angle to write to the servo.
    pub fn update_rudder(&mut self, sample: &DistanceSample, now: Instant) -> f64 {
        match self.mode {
            SteeringMode::Straight => {}
            SteeringMode::Avoiding => {
                self.pick_avoid_target(sample);
                self.rudder.angle +=
                    (self.rudder.target - self.rudder.angle) * self.rudder_gain;
            }
            SteeringMode::Returning => {
                if let Some(cleared) = self.cleared_at
                    && now.duration_since(cleared) >= self.return_delay
                {
                    self.rudder.target = self.center_angle;
                    self.rudder.angle +=
                        (self.center_angle - self.rudder.angle) * self.rudder_gain;

                    if (self.rudder.angle - self.center_angle).abs() < self.center_tolerance {
                        self.rudder.angle = self.center_angle;
                        self.rudder.direction = LABEL_GOING_STRAIGHT;
                        self.mode = SteeringMode::Straight;
                        self.cleared_at = None;
                    }
                }
            }
        }

        self.rudder.angle
    }

    /// Steer toward whichever side reads more open. On an exact tie the
    /// choice is delegated to the tie-break strategy. Re-picked every
    /// update, so the target flips if the side readings cross over.
    fn pick_avoid_target(&mut self, sample: &DistanceSample) {
        let turn = if sample.left > sample.right {
            Turn::Left
        } else if sample.right > sample.left {
            Turn::Right
        } else {
            self.tie_break.choose()
        };

        match turn {
            Turn::Left => {
                self.rudder.target = self.left_angle;
                self.rudder.direction = LABEL_TURNING_LEFT;
            }
            Turn::Right => {
                self.rudder.target = self.right_angle;
                self.rudder.direction = LABEL_TURNING_RIGHT;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(front: f64, left: f64, right: f64) -> DistanceSample {
        DistanceSample { front, left, right }
    }

    fn seeded_controller() -> SteeringController {
        SteeringController::with_tie_break(&Config::default(), Box::new(UniformTieBreak::seeded(7)))
    }

    #[test]
    fn test_front_obstacle_starts_avoidance() {
        let mut s = seeded_controller();
        let now = Instant::now();

        assert_eq!(s.mode(), SteeringMode::Straight);
        assert_eq!(s.desired_rpm(), 100.0);

        s.evaluate(&sample(0.50, 1.0, 2.0), now);
        assert_eq!(s.mode(), SteeringMode::Avoiding);
        assert_eq!(s.desired_rpm(), 50.0);
    }

    #[test]
    fn test_clear_front_does_not_trigger() {
        let mut s = seeded_controller();
        s.evaluate(&sample(0.51, 1.0, 2.0), Instant::now());
        assert_eq!(s.mode(), SteeringMode::Straight);
    }

    #[test]
    fn test_avoid_target_follows_open_side() {
        let mut s = seeded_controller();
        let now = Instant::now();
        s.evaluate(&sample(0.3, 2.0, 1.0), now);

        s.update_rudder(&sample(0.3, 2.0, 1.0), now);
        assert_eq!(s.rudder().target, 45.0);
        assert_eq!(s.rudder().direction, LABEL_TURNING_LEFT);

        // Side readings cross over: the target flips on the next update.
        s.update_rudder(&sample(0.3, 1.0, 2.0), now);
        assert_eq!(s.rudder().target, 135.0);
        assert_eq!(s.rudder().direction, LABEL_TURNING_RIGHT);
    }

    #[test]
    fn test_tie_break_is_roughly_uniform() {
        let mut s = seeded_controller();
        let now = Instant::now();
        s.evaluate(&sample(0.3, 1.0, 1.0), now);

        let mut lefts = 0;
        let mut rights = 0;
        for _ in 0..1000 {
            s.update_rudder(&sample(0.3, 1.0, 1.0), now);
            match s.rudder().target {
                t if t == 45.0 => lefts += 1,
                t if t == 135.0 => rights += 1,
                t => panic!("unexpected target {t}"),
            }
        }

        // Uniform draws over 1000 trials; both sides must show up often.
        assert!(lefts > 400, "left chosen only {lefts} times");
        assert!(rights > 400, "right chosen only {rights} times");
    }

    #[test]
    fn test_angle_converges_without_overshoot() {
        let mut s = seeded_controller();
        let now = Instant::now();
        let obstacle = sample(0.3, 2.0, 1.0);
        s.evaluate(&obstacle, now);

        let mut previous_gap = (s.rudder().angle - 45.0).abs();
        for _ in 0..60 {
            s.update_rudder(&obstacle, now);
            let gap = (s.rudder().angle - 45.0).abs();
            if gap == 0.0 {
                break;
            }
            assert!(gap < previous_gap, "|angle - target| must shrink every step");
            previous_gap = gap;
        }
        assert!(previous_gap < 1.0);
    }

    #[test]
    fn test_return_waits_out_the_grace_delay() {
        let mut s = seeded_controller();
        let t0 = Instant::now();
        let obstacle = sample(0.3, 2.0, 1.0);

        s.evaluate(&obstacle, t0);
        for _ in 0..10 {
            s.update_rudder(&obstacle, t0);
        }
        let held = s.rudder().angle;

        // Front clears; the clearing timestamp is recorded.
        let clear = sample(999.0, 2.0, 1.0);
        s.evaluate(&clear, t0);
        assert_eq!(s.mode(), SteeringMode::Returning);

        // 1999 ms after clearing: no movement yet.
        s.update_rudder(&clear, t0 + Duration::from_millis(1999));
        assert_eq!(s.rudder().angle, held);

        // 2001 ms after clearing: the rudder starts back toward center.
        s.update_rudder(&clear, t0 + Duration::from_millis(2001));
        assert!(s.rudder().angle > held);
    }

    #[test]
    fn test_centering_snaps_to_exact_center() {
        let mut s = seeded_controller();
        let t0 = Instant::now();
        let obstacle = sample(0.3, 2.0, 1.0);

        s.evaluate(&obstacle, t0);
        for _ in 0..10 {
            s.update_rudder(&obstacle, t0);
        }
        let clear = sample(999.0, 2.0, 1.0);
        s.evaluate(&clear, t0);

        let after_delay = t0 + Duration::from_millis(2500);
        let mut steps = 0;
        while s.mode() == SteeringMode::Returning {
            let before = s.rudder().angle;
            s.update_rudder(&clear, after_delay);
            if s.mode() == SteeringMode::Returning {
                // Still centering: the gap to center shrinks every step.
                assert!((s.rudder().angle - 90.0).abs() < (before - 90.0).abs());
            }
            steps += 1;
            assert!(steps < 100, "centering did not terminate");
        }

        assert_eq!(s.mode(), SteeringMode::Straight);
        assert_eq!(s.rudder().angle, 90.0);
        assert_eq!(s.rudder().direction, LABEL_GOING_STRAIGHT);
    }

    #[test]
    fn test_returning_ignores_new_obstacles() {
        let mut s = seeded_controller();
        let t0 = Instant::now();

        s.evaluate(&sample(0.3, 2.0, 1.0), t0);
        s.evaluate(&sample(999.0, 2.0, 1.0), t0);
        assert_eq!(s.mode(), SteeringMode::Returning);

        // Only the centering snap leaves Returning.
        s.evaluate(&sample(0.3, 2.0, 1.0), t0 + Duration::from_millis(100));
        assert_eq!(s.mode(), SteeringMode::Returning);
    }
}
