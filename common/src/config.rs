//! Application configuration: loop cadences, buffer capacities and the
//! soft access-point identity.
//!
//! Signal-level tunables (thresholds, EMA coefficients) live in
//! [`crate::thresholds`]; this module only holds structural constants.

/// Main poll loop cadence in milliseconds.
pub const TICK_MS: u64 = 10;

/// Capacity of the inter-beat-interval ring.
pub const RR_RING_LEN: usize = 8;

/// Accepted-BPM ring target; reaching it freezes the final estimate.
pub const PPG_TARGET_VALID: usize = 20;

/// Capacity of each per-color and overall BPM sample ring.
pub const BPM_RING_LEN: usize = 64;

/// Number of survey questions (and bits in a submission word).
pub const SURVEY_QUESTIONS: usize = 10;

/// Maximum characters per display line (128 px wide panel, 6 px glyphs).
pub const DISPLAY_LINE_LEN: usize = 21;

/// Soft access-point SSID (open network, captive behavior).
pub const AP_SSID: &str = "TheraLink";

/// Gateway / kiosk address on the soft AP, as octets.
pub const AP_ADDR: [u8; 4] = [192, 168, 4, 1];

/// Netmask prefix length of the AP subnet.
pub const AP_PREFIX_LEN: u8 = 24;

/// TCP port of the kiosk web surface.
pub const HTTP_PORT: u16 = 80;
