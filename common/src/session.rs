//! The master session state machine.
//!
//! One engine instance drives a full check-in: on-device question, PPG
//! measurement, phone survey, triage scoring, wristband color validation,
//! mood prompts and persistence. The engine owns the PPG estimator and the
//! color validator; the aggregation store, survey board and display lines
//! are shared with the web surface and passed in by reference each poll.
//!
//! The engine never touches hardware. Each poll it advertises which sensor
//! it wants ([`SessionEngine::demand`]); the firmware loop reads that
//! sensor and hands the sample in through [`TickInput`]. The two sensors
//! share an I²C bus but are demanded in disjoint states, so bus accesses
//! never interleave.

use core::fmt::Write;

use crate::color::{ColorClass, ColorSample, ColorValidator};
use crate::display::{DisplayLines, Line};
use crate::ppg::{PpgEstimator, PpgState, PulsePart};
use crate::stats::{StatsStore, TriageColor};
use crate::survey::SurveyBoard;
use crate::triage;

/// How long the measured BPM is shown before the survey opens.
const SHOW_BPM_MS: u64 = 1_500;
/// How long the recommendation is shown before color validation.
const TRIAGE_RESULT_MS: u64 = 3_000;
/// Wristband hand-out instruction time (also the baseline window host).
const COLOR_INTRO_MS: u64 = 5_000;
/// Thank-you screen time after persistence.
const SAVED_MS: u64 = 2_000;
/// Live-measurement display refresh cadence.
const UI_REFRESH_MS: u64 = 250;

/// Which mood dimension is being prompted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoodKind {
    Anxiety,
    Energy,
    Humor,
}

/// Orchestrator state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SessionState {
    /// Idle screen, waiting for a visitor.
    #[default]
    Ask,
    /// PPG measurement in progress.
    OxiRun,
    /// Showing the final BPM.
    ShowBpm,
    /// Survey open, waiting for a fresh submission.
    SurveyWait,
    /// Showing the recommended wristband color.
    TriageResult,
    /// Hand-out instructions; ambient baseline accumulates here.
    ColorIntro,
    /// Live classification until the right band is confirmed.
    ColorLoop,
    /// Mood level prompt (anxiety/energy/mood), joystick-driven.
    Mood(MoodKind),
    /// Persisted; thank-you screen.
    SaveAndDone,
    /// On-device group summary.
    Report,
}

/// Sensor the engine wants polled this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SensorDemand {
    None,
    Ppg,
    Color,
}

/// Everything the firmware loop feeds the engine each poll.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickInput {
    pub now_ms: u64,
    /// A pressed this tick (edge).
    pub btn_a: bool,
    /// B pressed this tick (edge).
    pub btn_b: bool,
    /// Joystick pressed this tick (edge).
    pub joy_click: bool,
    /// Joystick horizontal step: -1, 0 or +1.
    pub joy_step: i8,
    /// Raw IR sample, when [`SensorDemand::Ppg`] was honored.
    pub ppg_ir: Option<f32>,
    /// The PPG read failed this tick.
    pub ppg_bus_error: bool,
    /// Normalized RGBC reading, when [`SensorDemand::Color`] was honored.
    pub color: Option<ColorSample>,
}

/// The in-flight session fields (reset on every return to Ask).
#[derive(Default)]
struct Session {
    bpm: Option<f32>,
    survey_token: u32,
    recommended: Option<TriageColor>,
    validated: Option<TriageColor>,
    baseline_token: u32,
    mood_level: u8,
}

/// The master state machine.
pub struct SessionEngine {
    state: SessionState,
    session: Session,
    ppg: PpgEstimator,
    validator: ColorValidator,
    deadline: u64,
    next_ui: u64,
    /// Sticky one-line notice shown on the idle screen.
    notice: &'static str,
    /// Last gated color reading, for the ColorLoop display.
    last_class: Option<ColorClass>,
}

impl SessionEngine {
    pub fn new(part: PulsePart) -> Self {
        Self {
            state: SessionState::Ask,
            session: Session::default(),
            ppg: PpgEstimator::new(part),
            validator: ColorValidator::default(),
            deadline: 0,
            next_ui: 0,
            notice: "",
            last_class: None,
        }
    }

    /// Render the idle screen. Call once after boot, before the first poll.
    pub fn begin(
        &mut self,
        display: &mut DisplayLines,
    ) {
        self.enter_ask(display);
    }

    /// Current state.
    pub const fn state(&self) -> SessionState { self.state }

    /// Which sensor the firmware should poll before the next tick.
    pub const fn demand(&self) -> SensorDemand {
        match self.state {
            SessionState::OxiRun => SensorDemand::Ppg,
            SessionState::ColorIntro | SessionState::ColorLoop => SensorDemand::Color,
            _ => SensorDemand::None,
        }
    }

    /// Measured BPM of the in-flight session, if any.
    pub const fn bpm(&self) -> Option<f32> { self.session.bpm }

    /// Recommended wristband color, once scored.
    pub const fn recommended(&self) -> Option<TriageColor> { self.session.recommended }

    /// Advance the state machine by one poll.
    pub fn poll(
        &mut self,
        input: &TickInput,
        stats: &mut StatsStore,
        survey: &mut SurveyBoard,
        display: &mut DisplayLines,
    ) {
        match self.state {
            SessionState::Ask => self.tick_ask(input, stats, survey, display),
            SessionState::OxiRun => self.tick_oxi(input, display),
            SessionState::ShowBpm => self.tick_show_bpm(input, survey, display),
            SessionState::SurveyWait => self.tick_survey_wait(input, survey, display),
            SessionState::TriageResult => self.tick_triage_result(input, display),
            SessionState::ColorIntro => self.tick_color_intro(input, display),
            SessionState::ColorLoop => self.tick_color_loop(input, stats, display),
            SessionState::Mood(kind) => self.tick_mood(kind, input, stats, survey, display),
            SessionState::SaveAndDone => self.tick_saved(input, display),
            SessionState::Report => self.tick_report(input, display),
        }
    }

    // -------------------------------------------------------------------------
    // Per-state handlers
    // -------------------------------------------------------------------------

    fn tick_ask(
        &mut self,
        input: &TickInput,
        stats: &StatsStore,
        survey: &SurveyBoard,
        display: &mut DisplayLines,
    ) {
        if input.joy_click {
            self.enter_report(stats, survey, display);
        } else if input.btn_a {
            self.session = Session::default();
            self.notice = "";
            self.ppg.start(input.now_ms);
            self.state = SessionState::OxiRun;
            self.next_ui = 0;
            self.tick_oxi_display(input.now_ms, display);
        } else if input.btn_b {
            self.notice = "";
            self.enter_ask(display);
        }
    }

    fn tick_oxi(
        &mut self,
        input: &TickInput,
        display: &mut DisplayLines,
    ) {
        if input.btn_b {
            self.ppg.reset();
            self.enter_ask(display);
            return;
        }
        if input.ppg_bus_error {
            self.ppg.note_bus_error();
        }
        if let Some(ir) = input.ppg_ir {
            self.ppg.push_sample(input.now_ms, ir);
        }

        match self.ppg.state() {
            PpgState::Done => {
                self.session.bpm = self.ppg.final_bpm();
                self.ppg.reset();
                self.deadline = input.now_ms + SHOW_BPM_MS;
                self.state = SessionState::ShowBpm;

                let mut l2: Line = Line::new();
                let _ = write!(l2, "BPM: {:.0}", self.session.bpm.unwrap_or(0.0));
                display.set("Pulse measured", &l2, "", "");
            }
            PpgState::Error => {
                self.ppg.reset();
                self.notice = "Pulse sensor error";
                self.enter_ask(display);
            }
            _ => self.tick_oxi_display(input.now_ms, display),
        }
    }

    fn tick_oxi_display(
        &mut self,
        now_ms: u64,
        display: &mut DisplayLines,
    ) {
        if now_ms < self.next_ui {
            return;
        }
        self.next_ui = now_ms + UI_REFRESH_MS;
        match self.ppg.state() {
            PpgState::WaitFinger => {
                display.set("Measuring pulse", "Place finger on", "the sensor", "B: cancel");
            }
            PpgState::Settle => {
                display.set("Measuring pulse", "Hold still...", "", "B: cancel");
            }
            PpgState::Run => {
                let mut l2: Line = Line::new();
                let mut l3: Line = Line::new();
                if self.ppg.live_bpm() > 0.0 {
                    let _ = write!(l2, "BPM: {:.0}", self.ppg.live_bpm());
                } else {
                    let _ = l2.push_str("BPM: --");
                }
                let _ = write!(l3, "ok {}/20", self.ppg.valid_count());
                display.set("Measuring pulse", &l2, &l3, "B: cancel");
            }
            _ => {}
        }
    }

    fn tick_show_bpm(
        &mut self,
        input: &TickInput,
        survey: &mut SurveyBoard,
        display: &mut DisplayLines,
    ) {
        if input.now_ms < self.deadline {
            return;
        }
        survey.set_mode(true);
        self.session.baseline_token = survey.peek().token;
        self.state = SessionState::SurveyWait;
        display.set("Quick survey", "Join \"TheraLink\"", "answer on phone", "B: cancel");
    }

    fn tick_survey_wait(
        &mut self,
        input: &TickInput,
        survey: &mut SurveyBoard,
        display: &mut DisplayLines,
    ) {
        if input.btn_b {
            survey.set_mode(false);
            self.enter_ask(display);
            return;
        }
        let p = survey.peek();
        if !(p.pending && p.token != 0 && p.token != self.session.baseline_token) {
            return;
        }
        let Some((bits, token)) = survey.take() else {
            return;
        };
        self.session.survey_token = token;
        let color = triage::recommend(bits, self.session.bpm);
        self.session.recommended = Some(color);
        self.deadline = input.now_ms + TRIAGE_RESULT_MS;
        self.state = SessionState::TriageResult;

        let mut l2: Line = Line::new();
        let _ = write!(l2, "{} wristband", color.label());
        display.set("Your group:", &l2, "", "A: continue");
    }

    fn tick_triage_result(
        &mut self,
        input: &TickInput,
        display: &mut DisplayLines,
    ) {
        if input.now_ms < self.deadline && !input.btn_a {
            return;
        }
        self.validator.begin_baseline(input.now_ms);
        self.last_class = None;
        self.deadline = input.now_ms + COLOR_INTRO_MS;
        self.state = SessionState::ColorIntro;
        display.set("Get your wristband", "then hold it near", "the color sensor", "");
    }

    fn tick_color_intro(
        &mut self,
        input: &TickInput,
        display: &mut DisplayLines,
    ) {
        if input.btn_b {
            self.enter_ask(display);
            return;
        }
        if let Some(s) = input.color {
            self.validator.accumulate(input.now_ms, s);
        }
        let elapsed = input.now_ms >= self.deadline || input.btn_a;
        if elapsed && self.validator.ready() {
            self.state = SessionState::ColorLoop;
            self.next_ui = 0;
            self.tick_color_display(input.now_ms, display);
        }
    }

    fn tick_color_loop(
        &mut self,
        input: &TickInput,
        stats: &mut StatsStore,
        display: &mut DisplayLines,
    ) {
        if input.btn_b {
            self.enter_ask(display);
            return;
        }
        if let Some(s) = input.color {
            self.last_class = self.validator.read(s);
        }

        if input.btn_a {
            let band = self.last_class.and_then(ColorClass::as_wristband);
            match (band, self.session.recommended) {
                (Some(seen), Some(want)) if seen == want => {
                    self.session.validated = Some(seen);
                    stats.set_current_color(Some(seen));
                    self.session.mood_level = 2;
                    self.state = SessionState::Mood(MoodKind::Anxiety);
                    self.mood_display(MoodKind::Anxiety, display);
                    return;
                }
                (Some(_), Some(want)) => {
                    let mut l3: Line = Line::new();
                    let _ = write!(l3, "need {}", want.label());
                    display.set("Wrong wristband!", &self.seen_line(), &l3, "A: retry B: back");
                    self.next_ui = input.now_ms + 1_500;
                    return;
                }
                _ => {
                    display.set("No band detected", "move it closer to", "the sensor", "A: retry B: back");
                    self.next_ui = input.now_ms + 1_500;
                    return;
                }
            }
        }
        self.tick_color_display(input.now_ms, display);
    }

    fn tick_color_display(
        &mut self,
        now_ms: u64,
        display: &mut DisplayLines,
    ) {
        if now_ms < self.next_ui {
            return;
        }
        self.next_ui = now_ms + UI_REFRESH_MS;
        display.set("Validate wristband", &self.seen_line(), "", "A: confirm B: back");
    }

    fn seen_line(&self) -> Line {
        let mut line: Line = Line::new();
        match self.last_class {
            Some(c) => {
                let _ = write!(line, "seen: {}", c.label());
            }
            None => {
                let _ = line.push_str("seen: --");
            }
        }
        line
    }

    fn tick_mood(
        &mut self,
        kind: MoodKind,
        input: &TickInput,
        stats: &mut StatsStore,
        survey: &mut SurveyBoard,
        display: &mut DisplayLines,
    ) {
        if input.joy_step != 0 {
            let level = self.session.mood_level as i8 + input.joy_step;
            self.session.mood_level = level.clamp(1, 4) as u8;
            self.mood_display(kind, display);
            return;
        }

        let confirmed = input.btn_a;
        let skipped = input.btn_b;
        if !(confirmed || skipped) {
            return;
        }
        if confirmed {
            let level = self.session.mood_level;
            match kind {
                MoodKind::Anxiety => stats.add_anxiety(level),
                MoodKind::Energy => stats.add_energy(level),
                MoodKind::Humor => stats.add_humor(level),
            }
        }
        match kind {
            MoodKind::Anxiety => {
                self.session.mood_level = 2;
                self.state = SessionState::Mood(MoodKind::Energy);
                self.mood_display(MoodKind::Energy, display);
            }
            MoodKind::Energy => {
                self.session.mood_level = 2;
                self.state = SessionState::Mood(MoodKind::Humor);
                self.mood_display(MoodKind::Humor, display);
            }
            MoodKind::Humor => self.persist(input.now_ms, stats, survey, display),
        }
    }

    fn mood_display(
        &self,
        kind: MoodKind,
        display: &mut DisplayLines,
    ) {
        let title = match kind {
            MoodKind::Anxiety => "How anxious? (1-4)",
            MoodKind::Energy => "Energy level (1-4)",
            MoodKind::Humor => "Mood level (1-4)",
        };
        let mut l2: Line = Line::new();
        let _ = write!(l2, "level: {}", self.session.mood_level);
        display.set(title, &l2, "joy: adjust", "A: ok  B: skip");
    }

    /// SaveAndDone: route the session into the store, bind the survey token
    /// to the validated color and clear the latch.
    fn persist(
        &mut self,
        now_ms: u64,
        stats: &mut StatsStore,
        survey: &mut SurveyBoard,
        display: &mut DisplayLines,
    ) {
        if let Some(bpm) = self.session.bpm {
            stats.add_bpm(bpm);
        }
        if let Some(c) = self.session.validated {
            stats.inc_color(c);
            survey.assign(self.session.survey_token, c);
        }
        stats.set_current_color(None);

        self.deadline = now_ms + SAVED_MS;
        self.state = SessionState::SaveAndDone;
        display.set("Check-in saved", "Thank you!", "", "");
    }

    fn tick_saved(
        &mut self,
        input: &TickInput,
        display: &mut DisplayLines,
    ) {
        if input.now_ms >= self.deadline || input.btn_a {
            self.enter_ask(display);
        }
    }

    fn enter_report(
        &mut self,
        stats: &StatsStore,
        survey: &SurveyBoard,
        display: &mut DisplayLines,
    ) {
        let s = stats.snapshot(None);
        let mut l2: Line = Line::new();
        let _ = write!(l2, "G:{} Y:{} R:{}", s.cores[0], s.cores[1], s.cores[2]);
        let mut l3: Line = Line::new();
        match s.bpm_mean {
            Some(m) => {
                let _ = write!(l3, "surveys:{} bpm:{m:.0}", survey.agg(None).n);
            }
            None => {
                let _ = write!(l3, "surveys:{}", survey.agg(None).n);
            }
        }
        display.set("Group report", &l2, &l3, "joy: back");
        self.state = SessionState::Report;
    }

    fn tick_report(
        &mut self,
        input: &TickInput,
        display: &mut DisplayLines,
    ) {
        if input.joy_click {
            self.enter_ask(display);
        }
    }

    fn enter_ask(
        &mut self,
        display: &mut DisplayLines,
    ) {
        self.session = Session::default();
        self.last_class = None;
        self.state = SessionState::Ask;
        display.set("TheraLink", "A: start check-in", "joy: group report", self.notice);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
