//! Joystick horizontal-edge detection for level selection.
//!
//! The mood prompts pick an integer level (1..4) with left/right flicks.
//! A flick counts once: crossing a deflection threshold emits one step and
//! disarms the axis until the stick returns to the center band. Thresholds
//! are for the RP2350's 12-bit ADC.

/// Full-scale ADC reading.
pub const ADC_MAX: u16 = 4095;

/// Deflection below this reads as a left flick.
pub const LEFT_MAX: u16 = 800;

/// Deflection above this reads as a right flick.
pub const RIGHT_MIN: u16 = 3300;

/// Center band that re-arms the axis.
pub const CENTER_LO: u16 = 1500;
/// Upper bound of the re-arm band.
pub const CENTER_HI: u16 = 2600;

/// One-axis edge detector.
pub struct JoyAxis {
    armed: bool,
}

impl JoyAxis {
    pub const fn new() -> Self {
        Self { armed: true }
    }

    /// Feed one ADC reading; returns -1/0/+1.
    pub fn step(
        &mut self,
        raw: u16,
    ) -> i8 {
        if self.armed {
            if raw < LEFT_MAX {
                self.armed = false;
                return -1;
            }
            if raw > RIGHT_MIN {
                self.armed = false;
                return 1;
            }
        } else if (CENTER_LO..=CENTER_HI).contains(&raw) {
            self.armed = true;
        }
        0
    }
}

impl Default for JoyAxis {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flick_right_emits_once() {
        let mut axis = JoyAxis::new();
        assert_eq!(axis.step(2048), 0);
        assert_eq!(axis.step(4000), 1);
        // Held over: no repeat until re-centered.
        assert_eq!(axis.step(4095), 0);
        assert_eq!(axis.step(3500), 0);
        assert_eq!(axis.step(2048), 0); // re-arms
        assert_eq!(axis.step(4000), 1);
    }

    #[test]
    fn test_flick_left() {
        let mut axis = JoyAxis::new();
        assert_eq!(axis.step(100), -1);
        assert_eq!(axis.step(100), 0);
        assert_eq!(axis.step(2000), 0);
        assert_eq!(axis.step(700), -1);
    }

    #[test]
    fn test_partial_return_does_not_rearm() {
        let mut axis = JoyAxis::new();
        assert_eq!(axis.step(4000), 1);
        // Hovering between center and threshold: still disarmed.
        assert_eq!(axis.step(3000), 0);
        assert_eq!(axis.step(3200), 0);
        assert_eq!(axis.step(4000), 0);
    }

    #[test]
    fn test_threshold_ordering() {
        assert!(LEFT_MAX < CENTER_LO);
        assert!(CENTER_HI < RIGHT_MIN);
        assert!(RIGHT_MIN < ADC_MAX);
    }
}
