// This file is only compiled during tests

use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;

thread_local! {
    static MOCK_PWM_DUTY: RefCell<HashMap<u8, f64>> = RefCell::new(HashMap::new());
}

pub struct Pwm {
    pin: u8,
}

impl Pwm {
    pub fn new(pin: u8) -> Result<Self, Box<dyn Error>> {
        Ok(Pwm { pin })
    }

    pub fn set_duty_cycle(&mut self, duty_cycle: f64) -> Result<(), Box<dyn Error>> {
        MOCK_PWM_DUTY.with(|duty| {
            duty.borrow_mut().insert(self.pin, duty_cycle);
        });
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

// Test helper
pub fn get_mock_duty_cycle(pin: u8) -> f64 {
    MOCK_PWM_DUTY.with(|duty| *duty.borrow().get(&pin).unwrap_or(&0.0))
}

// Test helper
pub fn reset_mock_duty_cycles() {
    MOCK_PWM_DUTY.with(|duty| {
        duty.borrow_mut().clear();
    });
}
