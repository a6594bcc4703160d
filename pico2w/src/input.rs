//! Panel input sampling for the main loop.
//!
//! The kiosk has exactly three press inputs: A (confirm), B (cancel) and
//! the joystick click (report screen). One sampler owns all of them and is
//! polled once per tick; it reports the press edges the session engine
//! consumes. After any accepted edge an input is locked out for a short
//! window, so contact bounce cannot double-confirm a wristband or skip a
//! mood prompt.

use embassy_time::{Duration, Instant};

/// Post-edge lockout window. Level changes inside it are bounce.
const LOCKOUT: Duration = Duration::from_millis(50);

/// Press edges seen this tick.
#[derive(Clone, Copy, Default)]
pub struct PanelEvents {
    /// A pressed (confirm / advance).
    pub a: bool,
    /// B pressed (back / cancel).
    pub b: bool,
    /// Joystick clicked.
    pub joy_click: bool,
}

/// One tracked input.
struct Key {
    held: bool,
    locked_until: Instant,
}

impl Key {
    const fn new() -> Self {
        Self {
            held: false,
            locked_until: Instant::from_ticks(0),
        }
    }

    /// Accept a level change unless inside the lockout; returns the press
    /// edge. Pins are active-low, so `is_low` means pressed.
    fn edge(
        &mut self,
        now: Instant,
        is_low: bool,
    ) -> bool {
        if now < self.locked_until || is_low == self.held {
            return false;
        }
        self.held = is_low;
        self.locked_until = now + LOCKOUT;
        is_low
    }
}

/// Debounced state for the whole panel.
pub struct PanelInputs {
    a: Key,
    b: Key,
    joy: Key,
}

impl PanelInputs {
    pub const fn new() -> Self {
        Self {
            a: Key::new(),
            b: Key::new(),
            joy: Key::new(),
        }
    }

    /// Sample the three active-low pins for this tick.
    pub fn sample(
        &mut self,
        now: Instant,
        a_low: bool,
        b_low: bool,
        joy_low: bool,
    ) -> PanelEvents {
        PanelEvents {
            a: self.a.edge(now, a_low),
            b: self.b.edge(now, b_low),
            joy_click: self.joy.edge(now, joy_low),
        }
    }
}

impl Default for PanelInputs {
    fn default() -> Self {
        Self::new()
    }
}
