//! Heart-rate estimation from raw pulse-oximeter IR samples.
//!
//! The estimator consumes one raw IR sample per poll (nominally 100 Hz) and
//! runs a small state machine:
//!
//! `Idle → WaitFinger → Settle → Run → Done`
//!
//! - **WaitFinger**: waits for the IR level to clear the finger-present
//!   threshold. Absence uses a lower threshold plus a debounce so the gate
//!   does not flap.
//! - **Settle**: integrates ~2 s of samples to seed the DC baseline (mean)
//!   and AC RMS (√variance, clamped ≥ 1).
//! - **Run**: DC-EMA removal, RMS tracking, rising-edge beat detection with
//!   a refractory window, median-of-RR live BPM with smoothing, and an
//!   adaptive acceptance ring. Reaching the ring target freezes the final
//!   BPM (trimmed mean); a hard timeout falls back to whatever was accepted
//!   if at least three samples made it in.
//!
//! Bus trouble never advances the pipeline: transient read failures are
//! counted and only persistent failure surfaces as [`PpgState::Error`].

use heapless::Vec;
use micromath::F32Ext;

use crate::config::{PPG_TARGET_VALID, RR_RING_LEN};
use crate::stats::trimmed_mean;
use crate::thresholds::{
    ACCEPT_EVAL_MS,
    ACCEPT_STALL_MS,
    BEAT_K,
    BPM_PLAUSIBLE_MAX,
    BPM_PLAUSIBLE_MIN,
    DC_ALPHA,
    FINGER_OFF_DEBOUNCE_MS,
    FINGER_OFF_MIN_MAX30100,
    FINGER_OFF_MIN_MAX30102,
    FINGER_ON_MIN_MAX30100,
    FINGER_ON_MIN_MAX30102,
    LIVE_SMOOTH,
    PPG_BUS_ERROR_LIMIT,
    PPG_FINAL_TRIM,
    PPG_MIN_FALLBACK,
    PPG_TIMEOUT_MS,
    REFRACTORY_MS,
    RMS_BETA,
    RR_MAX_MS,
    RR_MIN_MS,
    RUN_DROPOUT_TOLERANCE_MS,
    SETTLE_MS,
    accept_tolerance,
};

/// Pulse-oximeter front-end variant, detected from the part ID register.
///
/// The two parts differ in sample width (16 vs 18 bit), so the finger gate
/// levels are parameterized by the detected part.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PulsePart {
    /// MAX30100, 16-bit samples.
    Max30100,
    /// MAX30102, 18-bit samples.
    Max30102,
}

impl PulsePart {
    /// IR level above which a finger counts as present.
    pub const fn finger_on_min(self) -> f32 {
        match self {
            Self::Max30100 => FINGER_ON_MIN_MAX30100,
            Self::Max30102 => FINGER_ON_MIN_MAX30102,
        }
    }

    /// IR level below which a finger counts as absent (after debounce).
    pub const fn finger_off_min(self) -> f32 {
        match self {
            Self::Max30100 => FINGER_OFF_MIN_MAX30100,
            Self::Max30102 => FINGER_OFF_MIN_MAX30102,
        }
    }
}

/// Externally visible estimator state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PpgState {
    /// Not measuring.
    #[default]
    Idle,
    /// Waiting for a finger on the sensor.
    WaitFinger,
    /// Integrating the baseline window.
    Settle,
    /// Measuring.
    Run,
    /// Final BPM frozen.
    Done,
    /// Persistent bus failure.
    Error,
}

/// PPG working set and state machine.
pub struct PpgEstimator {
    state: PpgState,
    part: PulsePart,

    // Finger gate
    below_since: Option<u64>,

    // Settle accumulation
    settle_start: u64,
    settle_sum: f32,
    settle_sq_sum: f32,
    settle_n: u32,

    // Run working set
    dc: f32,
    rms: f32,
    prev_ac: f32,
    rr_ms: Vec<u32, RR_RING_LEN>,
    last_beat: Option<u64>,
    live_bpm: f32,

    // Acceptance ring
    accepted: Vec<f32, PPG_TARGET_VALID>,
    last_accept: u64,
    next_eval: u64,
    deadline: u64,

    final_bpm: Option<f32>,
    bus_errors: u32,
}

impl PpgEstimator {
    /// Create an idle estimator for the given front-end part.
    pub fn new(part: PulsePart) -> Self {
        Self {
            state: PpgState::Idle,
            part,
            below_since: None,
            settle_start: 0,
            settle_sum: 0.0,
            settle_sq_sum: 0.0,
            settle_n: 0,
            dc: 0.0,
            rms: 1.0,
            prev_ac: 0.0,
            rr_ms: Vec::new(),
            last_beat: None,
            live_bpm: 0.0,
            accepted: Vec::new(),
            last_accept: 0,
            next_eval: 0,
            deadline: 0,
            final_bpm: None,
            bus_errors: 0,
        }
    }

    /// Begin a measurement: clears the working set and waits for a finger.
    pub fn start(&mut self, _now_ms: u64) {
        self.clear_working_set();
        self.final_bpm = None;
        self.bus_errors = 0;
        self.state = PpgState::WaitFinger;
    }

    /// Abort and return to idle. The final BPM (if frozen) is discarded.
    pub fn reset(&mut self) {
        self.clear_working_set();
        self.final_bpm = None;
        self.bus_errors = 0;
        self.state = PpgState::Idle;
    }

    /// Current state.
    pub const fn state(&self) -> PpgState { self.state }

    /// Smoothed live BPM, 0.0 until enough beats have been seen.
    pub const fn live_bpm(&self) -> f32 { self.live_bpm }

    /// Number of accepted estimates so far (non-decreasing while running).
    pub fn valid_count(&self) -> usize { self.accepted.len() }

    /// Final BPM, present once `Done`.
    pub const fn final_bpm(&self) -> Option<f32> { self.final_bpm }

    /// Record a failed bus read. The pipeline does not advance this tick;
    /// persistent failure latches `Error`.
    pub fn note_bus_error(&mut self) {
        if matches!(self.state, PpgState::Idle | PpgState::Done | PpgState::Error) {
            return;
        }
        self.bus_errors += 1;
        if self.bus_errors >= PPG_BUS_ERROR_LIMIT {
            self.state = PpgState::Error;
        }
    }

    /// Feed one raw IR sample.
    pub fn push_sample(
        &mut self,
        now_ms: u64,
        ir: f32,
    ) {
        self.bus_errors = 0;
        match self.state {
            PpgState::Idle | PpgState::Done | PpgState::Error => {}
            PpgState::WaitFinger => self.wait_finger(now_ms, ir),
            PpgState::Settle => self.settle(now_ms, ir),
            PpgState::Run => self.run(now_ms, ir),
        }
    }

    fn wait_finger(
        &mut self,
        now_ms: u64,
        ir: f32,
    ) {
        if ir > self.part.finger_on_min() {
            self.settle_start = now_ms;
            self.settle_sum = 0.0;
            self.settle_sq_sum = 0.0;
            self.settle_n = 0;
            self.state = PpgState::Settle;
        }
    }

    fn settle(
        &mut self,
        now_ms: u64,
        ir: f32,
    ) {
        if self.finger_lost(now_ms, ir) {
            self.clear_working_set();
            self.state = PpgState::WaitFinger;
            return;
        }

        self.settle_sum += ir;
        self.settle_sq_sum += ir * ir;
        self.settle_n += 1;

        if now_ms.saturating_sub(self.settle_start) >= SETTLE_MS && self.settle_n > 0 {
            let n = self.settle_n as f32;
            let mean = self.settle_sum / n;
            let var = (self.settle_sq_sum / n - mean * mean).max(0.0);
            self.dc = mean;
            self.rms = var.sqrt().max(1.0);
            self.prev_ac = 0.0;
            self.deadline = now_ms + PPG_TIMEOUT_MS;
            self.last_accept = now_ms;
            self.next_eval = now_ms + ACCEPT_EVAL_MS;
            self.state = PpgState::Run;
        }
    }

    fn run(
        &mut self,
        now_ms: u64,
        ir: f32,
    ) {
        if self.finger_lost(now_ms, ir) {
            self.clear_working_set();
            self.state = PpgState::WaitFinger;
            return;
        }
        if ir < self.part.finger_off_min() {
            // Inside the dropout tolerance: hold state, skip the junk sample.
            self.check_timeout(now_ms);
            return;
        }

        self.dc += DC_ALPHA * (ir - self.dc);
        let ac = ir - self.dc;
        self.rms = ((1.0 - RMS_BETA) * self.rms * self.rms + RMS_BETA * ac * ac)
            .sqrt()
            .max(1.0);

        let thr = BEAT_K * self.rms;
        let rising = self.prev_ac <= thr && thr < ac;
        if rising
            && self
                .last_beat
                .is_none_or(|t| now_ms.saturating_sub(t) >= REFRACTORY_MS)
        {
            if let Some(t) = self.last_beat {
                let delta = now_ms.saturating_sub(t) as u32;
                if delta > RR_MIN_MS && delta <= RR_MAX_MS {
                    if self.rr_ms.is_full() {
                        self.rr_ms.remove(0);
                    }
                    let _ = self.rr_ms.push(delta);
                }
            }
            self.last_beat = Some(now_ms);

            if self.rr_ms.len() >= 3 {
                let bpm_med = 60_000.0 / median_u32(&self.rr_ms);
                self.live_bpm = if self.live_bpm > 0.0 {
                    LIVE_SMOOTH * self.live_bpm + (1.0 - LIVE_SMOOTH) * bpm_med
                } else {
                    bpm_med
                };
            }
        }
        self.prev_ac = ac;

        if now_ms >= self.next_eval {
            self.next_eval = now_ms + ACCEPT_EVAL_MS;
            self.evaluate_acceptance(now_ms);
        }
        if self.state == PpgState::Run {
            self.check_timeout(now_ms);
        }
    }

    fn evaluate_acceptance(
        &mut self,
        now_ms: u64,
    ) {
        let live = self.live_bpm;
        if !(live > BPM_PLAUSIBLE_MIN && live < BPM_PLAUSIBLE_MAX) {
            return;
        }

        let accept = if self.accepted.is_empty() {
            true
        } else {
            let med = median_f32(&self.accepted);
            let tol = accept_tolerance(self.accepted.len());
            (live - med).abs() / med.max(1.0) <= tol
                || now_ms.saturating_sub(self.last_accept) > ACCEPT_STALL_MS
        };

        if accept {
            let _ = self.accepted.push(live);
            self.last_accept = now_ms;
            if self.accepted.len() >= PPG_TARGET_VALID {
                self.finish(PPG_FINAL_TRIM);
            }
        }
    }

    fn check_timeout(
        &mut self,
        now_ms: u64,
    ) {
        if now_ms < self.deadline {
            return;
        }
        if self.accepted.len() >= PPG_MIN_FALLBACK {
            // Few samples: trim as much as the ring allows.
            let trim = PPG_FINAL_TRIM.min((self.accepted.len() - 1) / 2);
            self.finish(trim);
        } else {
            self.clear_working_set();
            self.state = PpgState::WaitFinger;
        }
    }

    fn finish(
        &mut self,
        trim: usize,
    ) {
        let mut ring: Vec<f32, PPG_TARGET_VALID> = self.accepted.clone();
        self.final_bpm = Some(trimmed_mean(&mut ring, trim));
        self.state = PpgState::Done;
    }

    /// Debounced absence check. Returns true once the IR level has stayed
    /// below the off-threshold longer than the state tolerates.
    fn finger_lost(
        &mut self,
        now_ms: u64,
        ir: f32,
    ) -> bool {
        if ir >= self.part.finger_off_min() {
            self.below_since = None;
            return false;
        }
        let since = *self.below_since.get_or_insert(now_ms);
        let tolerance = match self.state {
            PpgState::Run => RUN_DROPOUT_TOLERANCE_MS,
            _ => FINGER_OFF_DEBOUNCE_MS,
        };
        now_ms.saturating_sub(since) > tolerance
    }

    fn clear_working_set(&mut self) {
        self.below_since = None;
        self.settle_sum = 0.0;
        self.settle_sq_sum = 0.0;
        self.settle_n = 0;
        self.dc = 0.0;
        self.rms = 1.0;
        self.prev_ac = 0.0;
        self.rr_ms.clear();
        self.last_beat = None;
        self.live_bpm = 0.0;
        self.accepted.clear();
        self.last_accept = 0;
        self.next_eval = 0;
        self.deadline = 0;
    }
}

/// Median of a non-empty u32 slice (mean of the middle pair for even sizes).
fn median_u32(xs: &[u32]) -> f32 {
    let mut buf: Vec<u32, RR_RING_LEN> = Vec::new();
    for &x in xs {
        let _ = buf.push(x);
    }
    buf.sort_unstable();
    let n = buf.len();
    if n % 2 == 1 {
        buf[n / 2] as f32
    } else {
        (buf[n / 2 - 1] as f32 + buf[n / 2] as f32) / 2.0
    }
}

/// Median of a non-empty f32 slice.
fn median_f32(xs: &[f32]) -> f32 {
    let mut buf: Vec<f32, PPG_TARGET_VALID> = Vec::new();
    for &x in xs {
        let _ = buf.push(x);
    }
    buf.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    let n = buf.len();
    if n % 2 == 1 {
        buf[n / 2]
    } else {
        (buf[n / 2 - 1] + buf[n / 2]) / 2.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
