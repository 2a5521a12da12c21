use crate::config::Config;

/// PID speed regulator. Converts the desired-RPM setpoint into a PWM duty
/// value in [0, 255]. Runs once per control tick.
///
/// The estimated RPM comes from a first-order lag on the applied duty,
/// standing in for tachometer feedback; a port to real feedback must keep
/// the same cadence and gains or the loop tuning no longer holds.
pub struct SpeedController {
    kp: f64,
    ki: f64,
    kd: f64,
    rpm_lag: f64,

    desired_rpm: f64,
    current_rpm: f64,

    error: f64,
    previous_error: f64,
    integral: f64,
    derivative: f64,
    output: f64,
}

impl SpeedController {
    pub fn new(cfg: &Config) -> Self {
        Self {
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
            rpm_lag: cfg.rpm_lag,
            desired_rpm: 0.0,
            current_rpm: 0.0,
            error: 0.0,
            previous_error: 0.0,
            integral: 0.0,
            derivative: 0.0,
            output: 0.0,
        }
    }

    pub fn set_desired_rpm(&mut self, rpm: f64) {
        self.desired_rpm = rpm;
    }

    pub fn desired_rpm(&self) -> f64 {
        self.desired_rpm
    }

    pub fn current_rpm(&self) -> f64 {
        self.current_rpm
    }

    /// The integral accumulates without bound or reset, so a long
    /// saturation winds it up. Readable so the growth can be observed.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// One regulation step. Returns the PWM duty to apply, in [0, 255].
    ///
    /// The output is formed from the accumulators as they stood after the
    /// previous step, then the new error is folded in, so the very first
    /// step is pure P.
    pub fn tick(&mut self) -> f64 {
        self.error = self.desired_rpm - self.current_rpm;

        self.output = (self.kp * self.error + self.ki * self.integral + self.kd * self.derivative)
            .clamp(0.0, 255.0);

        self.integral += self.error;
        self.derivative = self.error - self.previous_error;
        self.previous_error = self.error;

        // Actuator feedback model: the estimate chases the applied duty.
        self.current_rpm += (self.output - self.current_rpm) * self.rpm_lag;

        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SpeedController {
        SpeedController::new(&Config::default())
    }

    #[test]
    fn test_first_tick_is_pure_proportional() {
        let mut c = controller();
        c.set_desired_rpm(100.0);

        let duty = c.tick();

        // No integral or derivative contribution yet: Kp * 100.
        assert_eq!(duty, 100.0);
        assert_eq!(c.output(), 100.0);
        // Feedback model: 0 + (100 - 0) * 0.05
        assert!((c.current_rpm() - 5.0).abs() < 1e-12);
        assert_eq!(c.integral(), 100.0);
    }

    #[test]
    fn test_output_saturates_at_duty_ceiling() {
        let mut c = controller();
        c.set_desired_rpm(100.0);

        let mut saturated = false;
        for _ in 0..20 {
            if c.tick() == 255.0 {
                saturated = true;
            }
        }
        assert!(saturated, "integral action should drive the output to 255");
    }

    #[test]
    fn test_integral_winds_up_unbounded() {
        let mut c = controller();
        c.set_desired_rpm(100.0);

        let mut after_five = 0.0;
        for i in 0..10 {
            c.tick();
            if i == 4 {
                after_five = c.integral();
            }
        }

        // No clamp, no reset: while the error stays positive the
        // accumulator only grows.
        assert!(after_five > 0.0);
        assert!(c.integral() > after_five);
    }

    #[test]
    fn test_zero_setpoint_holds_zero() {
        let mut c = controller();
        c.set_desired_rpm(0.0);

        for _ in 0..5 {
            assert_eq!(c.tick(), 0.0);
        }
        assert_eq!(c.current_rpm(), 0.0);
    }
}
