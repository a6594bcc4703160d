//! Wristband color classification under adaptive lighting.
//!
//! The classifier works entirely on normalized channels: `r`, `g`, `b` are
//! each divided by the raw clear count, and `c_norm` is the clear count
//! divided by the sensor's integration full-scale, so every threshold lives
//! on one 0..1 scale.
//!
//! Validation runs in two stages:
//!
//! 1. An **ambient baseline** is accumulated for ~800 ms at validation
//!    entry, so "object present" can be judged relative to the booth's
//!    current lighting rather than an absolute level.
//! 2. Each live reading passes three **gates** (enough light, enough
//!    chroma, enough departure from ambient) before classification is
//!    trusted at all.
//!
//! Classification order matters: dark and white buckets are carved out
//! first, then yellow (which would otherwise shadow both red and green),
//! then the red/green ratio tests.

use crate::stats::TriageColor;
use crate::thresholds::{
    AMBIENT_BASELINE_MS,
    AMBIENT_MIN_SAMPLES,
    COLOR_C_MIN,
    COLOR_CHROMA_MIN,
    COLOR_DARK_FLOOR,
    COLOR_DELTA_C_MIN,
    HUE_RATIO_MIN,
    WHITE_C_MIN,
    WHITE_CHROMA_MAX,
};

/// One normalized RGBC reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorSample {
    /// Red fraction of the clear count.
    pub r: f32,
    /// Green fraction of the clear count.
    pub g: f32,
    /// Blue fraction of the clear count.
    pub b: f32,
    /// Clear count over the integration full-scale.
    pub c_norm: f32,
}

/// Discrete color bucket.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorClass {
    Green,
    Yellow,
    Red,
    Blue,
    White,
    Black,
    Unknown,
}

impl ColorClass {
    /// Wristband colors are the only classes that validate.
    pub const fn as_wristband(self) -> Option<TriageColor> {
        match self {
            Self::Green => Some(TriageColor::Green),
            Self::Yellow => Some(TriageColor::Yellow),
            Self::Red => Some(TriageColor::Red),
            _ => None,
        }
    }

    /// Short display label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
            Self::Blue => "BLUE",
            Self::White => "WHITE",
            Self::Black => "BLACK",
            Self::Unknown => "?",
        }
    }
}

/// Classify one normalized reading. First match wins.
pub fn classify(s: ColorSample) -> ColorClass {
    if s.c_norm < COLOR_DARK_FLOOR {
        return ColorClass::Black;
    }

    let r = s.r.clamp(0.0, 1.0);
    let g = s.g.clamp(0.0, 1.0);
    let b = s.b.clamp(0.0, 1.0);
    let chroma = r.max(g).max(b) - r.min(g).min(b);

    if chroma < WHITE_CHROMA_MAX && s.c_norm > WHITE_C_MIN {
        return ColorClass::White;
    }

    // Yellow before the ratio tests: R and G high and close, B low,
    // regardless of which of R/G is on top.
    if b < 0.30 && r > 0.38 && g > 0.38 && (r - g).abs() < 0.18 {
        return ColorClass::Yellow;
    }

    let rg_ratio = if g > 0.0 { r / g } else { 99.0 };
    let gr_ratio = if r > 0.0 { g / r } else { 99.0 };

    if rg_ratio > HUE_RATIO_MIN && r > 0.32 && b < 0.45 {
        return ColorClass::Red;
    }
    if gr_ratio > HUE_RATIO_MIN && g > 0.32 && b < 0.45 {
        return ColorClass::Green;
    }

    if b > r && b > g && b > 0.35 {
        return ColorClass::Blue;
    }

    ColorClass::Unknown
}

/// Ambient baseline accumulator plus the reading gates.
#[derive(Default)]
pub struct ColorValidator {
    start_ms: u64,
    sum_r: f32,
    sum_g: f32,
    sum_b: f32,
    sum_c: f32,
    n: u32,
    baseline: Option<ColorSample>,
}

impl ColorValidator {
    /// Start (or restart) baseline accumulation.
    pub fn begin_baseline(
        &mut self,
        now_ms: u64,
    ) {
        *self = Self::default();
        self.start_ms = now_ms;
    }

    /// True once the ambient baseline is stored.
    pub const fn ready(&self) -> bool { self.baseline.is_some() }

    /// Mean ambient reading, once ready.
    pub const fn baseline(&self) -> Option<ColorSample> { self.baseline }

    /// Feed one reading during baseline accumulation. Returns `ready()`.
    pub fn accumulate(
        &mut self,
        now_ms: u64,
        s: ColorSample,
    ) -> bool {
        if self.baseline.is_some() {
            return true;
        }
        self.sum_r += s.r;
        self.sum_g += s.g;
        self.sum_b += s.b;
        self.sum_c += s.c_norm;
        self.n += 1;

        if now_ms.saturating_sub(self.start_ms) >= AMBIENT_BASELINE_MS && self.n >= AMBIENT_MIN_SAMPLES
        {
            let n = self.n as f32;
            self.baseline = Some(ColorSample {
                r: self.sum_r / n,
                g: self.sum_g / n,
                b: self.sum_b / n,
                c_norm: self.sum_c / n,
            });
        }
        self.baseline.is_some()
    }

    /// Gate a live reading: `Some(class)` when the reading is actionable,
    /// `None` when it is too dark, too gray, or indistinct from ambient.
    pub fn read(
        &self,
        s: ColorSample,
    ) -> Option<ColorClass> {
        let base = self.baseline?;
        if s.c_norm <= COLOR_C_MIN {
            return None;
        }
        let chroma = s.r.max(s.g).max(s.b) - s.r.min(s.g).min(s.b);
        if chroma <= COLOR_CHROMA_MIN {
            return None;
        }
        let c0 = base.c_norm.max(1e-4);
        if (s.c_norm - c0).abs() / c0 <= COLOR_DELTA_C_MIN {
            return None;
        }
        Some(classify(s))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(
        r: f32,
        g: f32,
        b: f32,
        c: f32,
    ) -> ColorSample {
        ColorSample { r, g, b, c_norm: c }
    }

    fn settled_validator(ambient_c: f32) -> ColorValidator {
        let mut v = ColorValidator::default();
        v.begin_baseline(0);
        let s = sample(0.33, 0.33, 0.33, ambient_c);
        for i in 0..9 {
            v.accumulate(i * 100, s);
        }
        assert!(v.ready(), "baseline should settle after 800 ms");
        v
    }

    #[test]
    fn test_baseline_needs_time_and_samples() {
        let mut v = ColorValidator::default();
        v.begin_baseline(0);
        // Two samples far apart: window elapsed but too few samples.
        assert!(!v.accumulate(0, sample(0.3, 0.3, 0.3, 0.1)));
        assert!(!v.accumulate(900, sample(0.3, 0.3, 0.3, 0.1)));
        // Third sample inside the window completes it.
        assert!(v.accumulate(950, sample(0.3, 0.3, 0.3, 0.1)));
    }

    #[test]
    fn test_classify_black_and_white() {
        assert_eq!(classify(sample(0.3, 0.3, 0.3, 0.01)), ColorClass::Black);
        assert_eq!(classify(sample(0.34, 0.33, 0.32, 0.30)), ColorClass::White);
    }

    #[test]
    fn test_classify_wristband_hues() {
        // Scenario from the booth: red band close up.
        assert_eq!(classify(sample(0.55, 0.30, 0.15, 0.40)), ColorClass::Red);
        assert_eq!(classify(sample(0.25, 0.55, 0.18, 0.40)), ColorClass::Green);
        assert_eq!(classify(sample(0.45, 0.42, 0.12, 0.40)), ColorClass::Yellow);
    }

    #[test]
    fn test_yellow_wins_over_ratio_tests() {
        // R/G close and high: must be yellow even though r/g slightly > 1.
        let c = classify(sample(0.48, 0.40, 0.10, 0.40));
        assert_eq!(c, ColorClass::Yellow);
    }

    #[test]
    fn test_classify_blue_and_unknown() {
        assert_eq!(classify(sample(0.20, 0.25, 0.45, 0.40)), ColorClass::Blue);
        assert_eq!(classify(sample(0.36, 0.33, 0.20, 0.40)), ColorClass::Unknown);
    }

    #[test]
    fn test_gates_reject_weak_readings() {
        let v = settled_validator(0.10);

        // Too dark.
        assert_eq!(v.read(sample(0.5, 0.3, 0.2, 0.05)), None);
        // Too gray.
        assert_eq!(v.read(sample(0.35, 0.33, 0.32, 0.40)), None);
        // Indistinct from ambient clear level.
        assert_eq!(v.read(sample(0.55, 0.30, 0.15, 0.11)), None);
    }

    #[test]
    fn test_red_band_scenario() {
        // Ambient c0 = 0.10; wristband at c = 0.40 with strong red ratio.
        let v = settled_validator(0.10);
        let class = v.read(sample(0.55, 0.30, 0.15, 0.40));
        assert_eq!(class, Some(ColorClass::Red));
        assert_eq!(ColorClass::Red.as_wristband(), Some(TriageColor::Red));
    }

    #[test]
    fn test_only_wristband_colors_validate() {
        assert!(ColorClass::Green.as_wristband().is_some());
        assert!(ColorClass::Yellow.as_wristband().is_some());
        assert!(ColorClass::Red.as_wristband().is_some());
        assert!(ColorClass::Blue.as_wristband().is_none());
        assert!(ColorClass::White.as_wristband().is_none());
        assert!(ColorClass::Black.as_wristband().is_none());
        assert!(ColorClass::Unknown.as_wristband().is_none());
    }

    #[test]
    fn test_no_reading_before_baseline() {
        let mut v = ColorValidator::default();
        v.begin_baseline(0);
        assert_eq!(v.read(sample(0.55, 0.30, 0.15, 0.40)), None);
    }
}
