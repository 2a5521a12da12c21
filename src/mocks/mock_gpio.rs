// This file is only compiled during tests

use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Level {
    Low,
    High,
}

thread_local! {
    static MOCK_PINS: RefCell<HashMap<u8, Level>> = RefCell::new(HashMap::new());
}

pub struct Gpio;

impl Gpio {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Ok(Gpio)
    }

    pub fn get(&self, pin: u8) -> Result<Pin, Box<dyn Error>> {
        Ok(Pin { pin })
    }
}

pub struct Pin {
    pin: u8,
}

impl Pin {
    pub fn into_input(self) -> InputPin {
        MOCK_PINS.with(|pins| {
            pins.borrow_mut().entry(self.pin).or_insert(Level::Low);
        });
        InputPin { pin: self.pin }
    }

    pub fn into_output_low(self) -> OutputPin {
        MOCK_PINS.with(|pins| {
            pins.borrow_mut().insert(self.pin, Level::Low);
        });
        OutputPin { pin: self.pin }
    }
}

pub struct InputPin {
    pin: u8,
}

impl InputPin {
    pub fn read(&self) -> Level {
        MOCK_PINS.with(|pins| *pins.borrow().get(&self.pin).unwrap_or(&Level::Low))
    }
}

pub struct OutputPin {
    pin: u8,
}

impl OutputPin {
    pub fn set_high(&mut self) {
        set_mock_pin_level(self.pin, Level::High);
    }

    pub fn set_low(&mut self) {
        set_mock_pin_level(self.pin, Level::Low);
    }
}

// test helper function to set pin levels
pub fn set_mock_pin_level(pin: u8, level: Level) {
    MOCK_PINS.with(|pins| {
        pins.borrow_mut().insert(pin, level);
    });
}

// test helper to observe what an output pin was last driven to
pub fn get_mock_pin_level(pin: u8) -> Level {
    MOCK_PINS.with(|pins| *pins.borrow().get(&pin).unwrap_or(&Level::Low))
}

// test helper to reset all pins
pub fn reset_mock_pins() {
    MOCK_PINS.with(|pins| {
        pins.borrow_mut().clear();
    });
}
