//! Survey submission state and the token↔color binding protocol.
//!
//! Submissions arrive from the web surface as a 10-bit word (bit *i* = "yes"
//! to question *i*). Each submission is stamped with a fresh token from a
//! monotonic counter; token 0 is reserved for "no submission yet". The
//! orchestrator peeks without consuming, takes the pending submission when
//! it advances, and after the wristband is validated it assigns the token
//! to a color, which routes the submission into that color's aggregates.
//!
//! Turning survey-mode on clears only the *pending* flag: the last stored
//! bits and token survive, so the orchestrator can remember the pre-open
//! token as a baseline and ignore stale submissions.

use crate::config::SURVEY_QUESTIONS;
use crate::stats::TriageColor;

/// Per-scope survey aggregates.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SurveyAgg {
    /// Number of submissions.
    pub n: u32,
    /// Per-question "yes" counts.
    pub yes: [u32; SURVEY_QUESTIONS],
    /// Most recent submission word.
    pub last_bits: u16,
}

impl SurveyAgg {
    fn apply(
        &mut self,
        bits: u16,
    ) {
        self.n += 1;
        self.last_bits = bits;
        for (i, yes) in self.yes.iter_mut().enumerate() {
            if bits & (1 << i) != 0 {
                *yes += 1;
            }
        }
    }
}

/// A peeked submission.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SurveyPeek {
    pub bits: u16,
    pub token: u32,
    pub pending: bool,
}

/// Survey state owned by the web surface.
#[derive(Default)]
pub struct SurveyBoard {
    mode: bool,
    pending: bool,
    last_bits: u16,
    last_token: u32,
    counter: u32,
    global: SurveyAgg,
    per_color: [SurveyAgg; 3],
}

impl SurveyBoard {
    pub fn new() -> Self { Self::default() }

    /// Whether `/display` should redirect visitors into the survey.
    pub const fn mode(&self) -> bool { self.mode }

    /// Turn survey-mode on or off. Turning it on clears the pending flag
    /// but keeps the last submission and token intact.
    pub fn set_mode(
        &mut self,
        on: bool,
    ) {
        if on {
            self.pending = false;
        }
        self.mode = on;
    }

    /// Clear only the pending flag.
    pub fn reset_pending(&mut self) {
        self.pending = false;
    }

    /// Inspect the last submission without consuming it.
    pub const fn peek(&self) -> SurveyPeek {
        SurveyPeek {
            bits: self.last_bits,
            token: self.last_token,
            pending: self.pending,
        }
    }

    /// Consume the pending submission, if any.
    pub fn take(&mut self) -> Option<(u16, u32)> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some((self.last_bits, self.last_token))
    }

    /// Record an arriving submission: stamps a fresh nonzero token, updates
    /// the global aggregates, sets pending and closes survey-mode.
    /// Returns the token.
    pub fn submit(
        &mut self,
        bits: u16,
    ) -> u32 {
        self.counter += 1;
        self.last_bits = bits;
        self.last_token = self.counter;
        self.pending = true;
        self.mode = false;
        self.global.apply(bits);
        self.last_token
    }

    /// Attribute the submission identified by `token` to a color. Only the
    /// most recent submission can be attributed, and never token 0.
    /// Callers call at most once per token.
    pub fn assign(
        &mut self,
        token: u32,
        color: TriageColor,
    ) {
        if token == 0 || token != self.last_token {
            return;
        }
        self.per_color[color as usize].apply(self.last_bits);
    }

    /// Aggregates, optionally filtered to one color.
    pub const fn agg(
        &self,
        filter: Option<TriageColor>,
    ) -> &SurveyAgg {
        match filter {
            Some(c) => &self.per_color[c as usize],
            None => &self.global,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_monotone_and_nonzero() {
        let mut b = SurveyBoard::new();
        let mut prev = 0;
        for bits in [0u16, 0x3FF, 0x155] {
            let t = b.submit(bits);
            assert!(t > prev, "token must increase");
            assert_ne!(t, 0);
            prev = t;
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut b = SurveyBoard::new();
        let t = b.submit(0b101);
        assert_eq!(
            b.peek(),
            SurveyPeek { bits: 0b101, token: t, pending: true }
        );
        assert_eq!(b.peek().pending, true);
        assert_eq!(b.take(), Some((0b101, t)));
        assert_eq!(b.take(), None);
        // Bits and token survive the take; only pending is gone.
        assert_eq!(b.peek().token, t);
    }

    #[test]
    fn test_set_mode_keeps_last_submission() {
        let mut b = SurveyBoard::new();
        let t = b.submit(0x2A);
        b.set_mode(true);
        let p = b.peek();
        assert!(!p.pending, "opening the survey clears pending");
        assert_eq!(p.bits, 0x2A);
        assert_eq!(p.token, t);
        assert!(b.mode());
    }

    #[test]
    fn test_submit_closes_mode() {
        let mut b = SurveyBoard::new();
        b.set_mode(true);
        b.submit(0);
        assert!(!b.mode());
    }

    #[test]
    fn test_assign_routes_to_color() {
        let mut b = SurveyBoard::new();
        let bits = (1 << 7) | (1 << 1);
        let t = b.submit(bits);
        b.assign(t, TriageColor::Red);

        let red = b.agg(Some(TriageColor::Red));
        assert_eq!(red.n, 1);
        assert_eq!(red.yes[7], 1);
        assert_eq!(red.yes[1], 1);
        assert_eq!(red.yes[0], 0);
        assert_eq!(red.last_bits, bits);

        assert_eq!(b.agg(Some(TriageColor::Green)).n, 0);
        assert_eq!(b.agg(None).n, 1);
    }

    #[test]
    fn test_assign_rejects_zero_and_stale_tokens() {
        let mut b = SurveyBoard::new();
        b.assign(0, TriageColor::Green);
        assert_eq!(b.agg(Some(TriageColor::Green)).n, 0);

        let stale = b.submit(0b1);
        let _fresh = b.submit(0b10);
        b.assign(stale, TriageColor::Green);
        assert_eq!(b.agg(Some(TriageColor::Green)).n, 0);
    }

    #[test]
    fn test_reset_pending_keeps_aggregates() {
        let mut b = SurveyBoard::new();
        let t = b.submit(0b111);
        b.reset_pending();
        assert!(!b.peek().pending);
        assert_eq!(b.peek().token, t);
        assert_eq!(b.agg(None).n, 1);
    }

    #[test]
    fn test_global_agg_counts_every_submission() {
        let mut b = SurveyBoard::new();
        b.submit(0b11);
        b.submit(0b01);
        let g = b.agg(None);
        assert_eq!(g.n, 2);
        assert_eq!(g.yes[0], 2);
        assert_eq!(g.yes[1], 1);
        assert_eq!(g.last_bits, 0b01);
    }
}
