use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The vehicle's on/off gate. Cloneable handle around one shared flag: the
/// HTTP service thread toggles it, the control loop reads it. Nothing else
/// crosses that thread boundary.
#[derive(Clone)]
pub struct PowerSwitch {
    on: Arc<AtomicBool>,
}

impl PowerSwitch {
    pub fn new(on: bool) -> Self {
        Self {
            on: Arc::new(AtomicBool::new(on)),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    pub fn set(&self, on: bool) {
        self.on.store(on, Ordering::Relaxed);
    }

    /// Flip the flag and return the new state.
    pub fn toggle(&self) -> bool {
        !self.on.fetch_xor(true, Ordering::Relaxed)
    }
}
