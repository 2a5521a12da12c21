use std::error::Error;
use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::actuators::{Buzzer, MotorDrive, RudderServo};
use crate::config::Config;
use crate::power::PowerSwitch;
use crate::range_sensor::{DistanceSample, RangeSensorArray};
use crate::speed::SpeedController;
use crate::steering::SteeringController;
use crate::telemetry::TelemetrySnapshot;

/// Everything the control loop touches, in one place. Each task takes the
/// vehicle by exclusive borrow for its whole run, so all state keeps a
/// single writer without any locking.
pub struct Vehicle {
    pub sensors: RangeSensorArray,
    pub steering: SteeringController,
    pub speed: SpeedController,
    pub servo: RudderServo,
    pub motor: MotorDrive,
    pub buzzer: Buzzer,
    pub power: PowerSwitch,
    last_sample: DistanceSample,
    center_angle: f64,
    telemetry: Option<Sender<TelemetrySnapshot>>,
}

impl Vehicle {
    pub fn new(cfg: &Config, power: PowerSwitch) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            sensors: RangeSensorArray::new(cfg)?,
            steering: SteeringController::new(cfg),
            speed: SpeedController::new(cfg),
            servo: RudderServo::new(cfg)?,
            motor: MotorDrive::new(cfg)?,
            buzzer: Buzzer::new(cfg)?,
            power,
            last_sample: DistanceSample::out_of_range(cfg.no_echo_distance),
            center_angle: cfg.center_angle,
            telemetry: None,
        })
    }

    /// Attach the channel feeding the telemetry reporter thread.
    pub fn set_telemetry(&mut self, tx: Sender<TelemetrySnapshot>) {
        self.telemetry = Some(tx);
    }

    /// Latest sensor sweep; stale by up to one control interval.
    pub fn last_sample(&self) -> DistanceSample {
        self.last_sample
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            front_distance: self.last_sample.front,
            left_distance: self.last_sample.left,
            right_distance: self.last_sample.right,
            motor_speed: self.speed.current_rpm(),
            rudder_direction: self.steering.rudder().direction.to_string(),
        }
    }

    /// Powered control step: sweep the sensors, run the mode transitions,
    /// and regulate the motor against the mode's RPM setpoint.
    pub fn control_task(&mut self, now: Instant) -> Result<(), Box<dyn Error>> {
        self.last_sample = self.sensors.sample_all();
        self.steering.evaluate(&self.last_sample, now);

        self.speed.set_desired_rpm(self.steering.desired_rpm());
        let duty = self.speed.tick();
        self.motor.apply_duty(duty)?;

        Ok(())
    }

    /// Ease the rudder toward its target and write the servo.
    pub fn rudder_task(&mut self, now: Instant) -> Result<(), Box<dyn Error>> {
        let angle = self.steering.update_rudder(&self.last_sample, now);
        self.servo.set_angle(angle)
    }

    pub fn buzzer_task(&mut self) {
        self.buzzer.toggle();
    }

    pub fn silence_buzzer(&mut self) {
        self.buzzer.off();
    }

    /// Unpowered step: hold the actuators at rest. Steering and PID state
    /// are left alone, so the machine resumes where it was on power-up.
    pub fn rest_task(&mut self) -> Result<(), Box<dyn Error>> {
        self.speed.set_desired_rpm(0.0);
        self.motor.apply_duty(0.0)?;
        self.servo.set_angle(self.center_angle)?;
        self.buzzer.off();
        Ok(())
    }

    pub fn telemetry_task(&mut self) {
        if let Some(tx) = &self.telemetry
            && tx.send(self.snapshot()).is_err()
        {
            eprintln!("Telemetry reporter is gone; dropping snapshot");
        }
    }
}
