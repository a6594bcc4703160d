//! Survey + BPM risk scoring.
//!
//! The score is a pure function of the 10-bit survey word and the measured
//! BPM, so the recommendation is reproducible from the captured data alone.
//!
//! # Question order
//!
//! Bit *i* is the answer to question *i* of the served survey page, "yes"
//! as 1. The order is fixed and the weights below are tied to it:
//!
//! | bit | question | risk on |
//! |---|---|---|
//! | 0 | strong physical pain now        | yes (+2) |
//! | 1 | ate and hydrated adequately     | **no** (+1) |
//! | 2 | slept well in the last 24 h     | **no** (+1) |
//! | 3 | strong fatigue                  | yes (+1) |
//! | 4 | strong conflict with someone    | yes (+2) |
//! | 5 | felt very nervous today         | yes (+2) |
//! | 6 | trouble concentrating           | yes (+1) |
//! | 7 | feels at risk of crisis now     | yes (+3) |
//! | 8 | avoiding the group today        | yes (+1) |
//! | 9 | wants to talk with an adult     | yes (+3) |

use crate::stats::TriageColor;
use crate::thresholds::{
    BPM_BAND_ELEVATED,
    BPM_BAND_HIGH,
    BPM_BAND_LOW,
    BPM_DEFAULT,
    RISK_RED_MIN,
    RISK_YELLOW_MIN,
};

/// Per-bit risk weights; negative polarity bits score when *unset*.
const WEIGHTS: [(u8, bool); 10] = [
    (2, true),  // strong pain
    (1, false), // did not eat/hydrate
    (1, false), // did not sleep well
    (1, true),  // strong fatigue
    (2, true),  // strong conflict
    (2, true),  // very nervous
    (1, true),  // concentration trouble
    (3, true),  // crisis risk now
    (1, true),  // avoiding group
    (3, true),  // wants to talk with adult
];

/// Risk contribution of the measured heart rate.
fn bpm_band(bpm: f32) -> u8 {
    if bpm >= BPM_BAND_HIGH {
        2
    } else if bpm >= BPM_BAND_ELEVATED || bpm < BPM_BAND_LOW {
        1
    } else {
        0
    }
}

/// Total risk score for a submission. A missing BPM scores as the
/// population default.
pub fn risk_score(
    bits: u16,
    bpm: Option<f32>,
) -> u8 {
    let mut risk = 0u8;
    for (i, &(weight, on_yes)) in WEIGHTS.iter().enumerate() {
        let yes = bits & (1 << i) != 0;
        if yes == on_yes {
            risk += weight;
        }
    }
    risk + bpm_band(bpm.unwrap_or(BPM_DEFAULT))
}

/// Map a risk score to a wristband recommendation.
pub const fn recommend_for_risk(risk: u8) -> TriageColor {
    if risk >= RISK_RED_MIN {
        TriageColor::Red
    } else if risk >= RISK_YELLOW_MIN {
        TriageColor::Yellow
    } else {
        TriageColor::Green
    }
}

/// Score a submission and recommend a wristband color.
pub fn recommend(
    bits: u16,
    bpm: Option<f32>,
) -> TriageColor {
    recommend_for_risk(risk_score(bits, bpm))
}

// =============================================================================
// Unit Tests
// =============================================================================
