use std::time::Duration;

/// All tunable settings in one place: pin assignments, control thresholds,
/// gains, task intervals, and network endpoints. Components copy the fields
/// they need at construction, so tests can substitute values freely.
#[derive(Debug, Clone)]
pub struct Config {
    // ** GPIO CONFIGURATION ** //
    /// Trigger pins for the front, left, and right range channels.
    pub trigger_pins: [u8; 3],
    /// Echo pins for the front, left, and right range channels.
    pub echo_pins: [u8; 3],
    /// Hardware PWM pin for the steering servo
    /// - GPIO 18 (PWM0) - Most commonly used
    pub servo_pin: u8,
    /// Hardware PWM pin for the drive motor (GPIO 19 = PWM1).
    pub motor_pin: u8,
    /// Plain GPIO output driving the obstacle buzzer.
    pub buzzer_pin: u8,

    // ** RANGE SENSOR CONFIGURATION ** //
    /// Hard timeout on the echo high-pulse wait. A channel that stays
    /// silent past this reports `no_echo_distance` instead of failing.
    pub echo_timeout: Duration,
    /// Settle time between consecutive channels. Channels fire one at a
    /// time; a second transducer firing while an echo is still in flight
    /// reads back false echoes.
    pub channel_settle: Duration,
    /// Distance reported when no echo returns in time. Downstream this
    /// means "no obstacle in range", never a fault.
    pub no_echo_distance: f64,

    // ** STEERING CONFIGURATION ** //
    /// Front distance at or below this starts an avoidance maneuver (meters).
    pub front_threshold_m: f64,
    /// Rudder angle for a full left turn (degrees).
    pub left_angle: f64,
    /// Rudder angle for a full right turn (degrees).
    pub right_angle: f64,
    /// Rudder angle for straight-ahead travel (degrees).
    pub center_angle: f64,
    /// Fraction of the remaining angle error applied per rudder update.
    pub rudder_gain: f64,
    /// Once the rudder is within this many degrees of center it snaps to
    /// exactly center and the maneuver ends.
    pub center_tolerance: f64,
    /// Grace period after the front clears before the rudder starts back
    /// toward center, so a reading flickering near the threshold cannot
    /// flap the rudder.
    pub return_delay: Duration,

    // ** SPEED CONFIGURATION ** //
    /// PID controller gains
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// First-order lag coefficient of the RPM feedback model.
    pub rpm_lag: f64,
    /// Desired RPM while an avoidance maneuver is in progress.
    pub avoid_rpm: f64,
    /// Desired RPM for normal cruise.
    pub cruise_rpm: f64,

    // ** SCHEDULER CONFIGURATION ** //
    /// Sensor sweep + steering evaluation + PID step, gated by power.
    pub control_interval: Duration,
    /// Rudder smoothing update.
    pub rudder_interval: Duration,
    /// Buzzer on/off cadence while not going straight.
    pub buzzer_interval: Duration,
    /// Telemetry push of the latest readings, independent of power.
    pub telemetry_interval: Duration,

    // ** NETWORK CONFIGURATION ** //
    /// Bind address of the power toggle/status HTTP service.
    pub http_bind: String,
    /// host:port of the telemetry sink.
    pub telemetry_addr: String,
    /// Request path on the telemetry sink.
    pub telemetry_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger_pins: [23, 24, 25],
            echo_pins: [17, 27, 22],
            servo_pin: 18,
            motor_pin: 19,
            buzzer_pin: 26,

            echo_timeout: Duration::from_millis(30),
            channel_settle: Duration::from_millis(50),
            no_echo_distance: 999.0,

            front_threshold_m: 0.50,
            left_angle: 45.0,
            right_angle: 135.0,
            center_angle: 90.0,
            rudder_gain: 0.3,
            center_tolerance: 2.0,
            return_delay: Duration::from_millis(2000),

            kp: 1.0,
            ki: 0.5,
            kd: 0.1,
            rpm_lag: 0.05,
            avoid_rpm: 50.0,
            cruise_rpm: 100.0,

            control_interval: Duration::from_millis(1000),
            rudder_interval: Duration::from_millis(100),
            buzzer_interval: Duration::from_millis(500),
            telemetry_interval: Duration::from_millis(2000),

            http_bind: "0.0.0.0:80".to_string(),
            telemetry_addr: "192.168.1.100:8000".to_string(),
            telemetry_path: "/telemetry".to_string(),
        }
    }
}
