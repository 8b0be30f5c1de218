//! Status indicator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A visible on/off indicator, such as an LED.
pub trait Indicator {
    fn set(&mut self, on: bool);

    fn toggle(&mut self);

    fn is_on(&self) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Indicator which reports its changes to the log.
#[derive(Debug)]
pub struct LogIndicator {
    name: &'static str,
    on: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogIndicator {
    pub fn new(name: &'static str) -> Self {
        Self { name, on: false }
    }
}

impl Indicator for LogIndicator {
    fn set(&mut self, on: bool) {
        if on != self.on {
            debug!("{} {}", self.name, if on { "on" } else { "off" });
        }
        self.on = on;
    }

    fn toggle(&mut self) {
        self.set(!self.on)
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
