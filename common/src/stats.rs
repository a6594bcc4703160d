//! Aggregation store: per-color and overall accumulators, derived indices
//! and the CSV export.
//!
//! All mutation goes through the documented entry points. While a current
//! color is latched (between wristband validation and persistence), every
//! accumulator call routes into that color's bucket *and* the overall
//! rollup, with identical values, so there is no cross-color leakage by
//! construction.

use heapless::Vec;
use micromath::F32Ext;

use crate::config::BPM_RING_LEN;

/// Wristband / triage outcome color.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriageColor {
    Green = 0,
    Yellow = 1,
    Red = 2,
}

impl TriageColor {
    /// All colors, bucket order.
    pub const ALL: [Self; 3] = [Self::Green, Self::Yellow, Self::Red];

    /// Wire name used by the web surface (`/stats.json?color=`, JSON keys).
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Green => "verde",
            Self::Yellow => "amarelo",
            Self::Red => "vermelho",
        }
    }

    /// Parse a wire name.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "verde" => Some(Self::Green),
            "amarelo" => Some(Self::Yellow),
            "vermelho" => Some(Self::Red),
            _ => None,
        }
    }

    /// Display label for the kiosk screen.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

/// Sorted-trim mean: drops `trim_each_end` extremes from each end when the
/// slice is large enough, otherwise falls back to the plain mean.
/// Returns NaN for an empty slice. Sorts in place.
pub fn trimmed_mean(
    xs: &mut [f32],
    trim_each_end: usize,
) -> f32 {
    let n = xs.len();
    if n == 0 {
        return f32::NAN;
    }
    let trim = if n > 2 * trim_each_end { trim_each_end } else { 0 };
    xs.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    let inner = &xs[trim..n - trim];
    let sum: f32 = inner.iter().sum();
    sum / inner.len() as f32
}

/// Bessel-corrected standard deviation; `None` below two samples.
fn stddev(xs: &[f32]) -> Option<f32> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let mean = xs.iter().sum::<f32>() / n as f32;
    let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / (n - 1) as f32;
    Some(var.max(0.0).sqrt())
}

/// Bounded BPM ring, drop-oldest on overflow.
#[derive(Default)]
struct BpmRing {
    buf: Vec<f32, BPM_RING_LEN>,
    head: usize,
}

impl BpmRing {
    fn push(
        &mut self,
        x: f32,
    ) {
        if self.buf.is_full() {
            self.buf[self.head] = x;
            self.head = (self.head + 1) % BPM_RING_LEN;
        } else {
            let _ = self.buf.push(x);
        }
    }

    fn len(&self) -> usize { self.buf.len() }

    fn copy(&self) -> Vec<f32, BPM_RING_LEN> { self.buf.clone() }
}

/// `(sum, count)` accumulator for 1..4 level inputs.
#[derive(Default)]
struct LevelAcc {
    sum: f32,
    count: u32,
}

impl LevelAcc {
    fn add(
        &mut self,
        level: u8,
    ) {
        self.sum += f32::from(level);
        self.count += 1;
    }

    fn mean(&self) -> Option<f32> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f32)
        }
    }

    /// Mean mapped from the 1..4 scale onto 0..1.
    fn norm(&self) -> Option<f32> {
        self.mean().map(|avg| ((avg - 1.0) / 3.0).clamp(0.0, 1.0))
    }
}

/// One aggregation scope (overall, or one wristband color).
#[derive(Default)]
struct Bucket {
    bpm: BpmRing,
    bpm_last: Option<f32>,
    anxiety: LevelAcc,
    energy: LevelAcc,
    humor: LevelAcc,
}

impl Bucket {
    fn add_bpm(
        &mut self,
        x: f32,
    ) {
        self.bpm.push(x);
        self.bpm_last = Some(x);
    }
}

/// Point-in-time aggregate view, as served by `/stats.json` and the CSV.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct StatsSnapshot {
    /// Trimmed mean of the BPM ring (1 from each end once n > 2).
    pub bpm_mean: Option<f32>,
    /// Most recent accepted BPM.
    pub bpm_last: Option<f32>,
    /// Bessel-corrected ring standard deviation (n ≥ 2).
    pub bpm_stddev: Option<f32>,
    /// Samples currently in the ring.
    pub bpm_n: u32,
    /// Wristband counts, bucket order green/yellow/red. Under a color
    /// filter, counts outside the filter are zeroed.
    pub cores: [u32; 3],
    /// Sum of the visible color counts.
    pub checkins_total: u32,
    pub anxiety_mean: Option<f32>,
    pub anxiety_n: u32,
    pub energy_mean: Option<f32>,
    pub energy_n: u32,
    pub humor_mean: Option<f32>,
    pub humor_n: u32,
    /// 0–100, from energy, mood and inverted anxiety.
    pub wellbeing_index: Option<f32>,
    /// 0–100, from anxiety alone.
    pub calm_index: Option<f32>,
}

/// The aggregation store.
#[derive(Default)]
pub struct StatsStore {
    overall: Bucket,
    per_color: [Bucket; 3],
    color_counts: [u32; 3],
    current: Option<TriageColor>,
}

impl StatsStore {
    pub fn new() -> Self { Self::default() }

    /// Latch (or clear) the color all subsequent inputs route into.
    pub fn set_current_color(
        &mut self,
        c: Option<TriageColor>,
    ) {
        self.current = c;
    }

    /// Currently latched color.
    pub const fn current_color(&self) -> Option<TriageColor> { self.current }

    /// Record a final BPM. Out-of-range values are dropped.
    pub fn add_bpm(
        &mut self,
        bpm: f32,
    ) {
        if !(bpm > 0.0 && bpm < 250.0) {
            return;
        }
        self.overall.add_bpm(bpm);
        if let Some(c) = self.current {
            self.per_color[c as usize].add_bpm(bpm);
        }
    }

    /// Count a handed-out wristband.
    pub fn inc_color(
        &mut self,
        c: TriageColor,
    ) {
        self.color_counts[c as usize] += 1;
    }

    /// Record an anxiety level (1..=4).
    pub fn add_anxiety(
        &mut self,
        level: u8,
    ) {
        if !(1..=4).contains(&level) {
            return;
        }
        self.overall.anxiety.add(level);
        if let Some(c) = self.current {
            self.per_color[c as usize].anxiety.add(level);
        }
    }

    /// Record an energy level (1..=4).
    pub fn add_energy(
        &mut self,
        level: u8,
    ) {
        if !(1..=4).contains(&level) {
            return;
        }
        self.overall.energy.add(level);
        if let Some(c) = self.current {
            self.per_color[c as usize].energy.add(level);
        }
    }

    /// Record a mood level (1..=4).
    pub fn add_humor(
        &mut self,
        level: u8,
    ) {
        if !(1..=4).contains(&level) {
            return;
        }
        self.overall.humor.add(level);
        if let Some(c) = self.current {
            self.per_color[c as usize].humor.add(level);
        }
    }

    /// Aggregate view, optionally filtered to one color's buckets.
    pub fn snapshot(
        &self,
        filter: Option<TriageColor>,
    ) -> StatsSnapshot {
        let bucket = match filter {
            Some(c) => &self.per_color[c as usize],
            None => &self.overall,
        };

        let mut ring = bucket.bpm.copy();
        let bpm_n = ring.len() as u32;
        let bpm_stddev = stddev(&ring);
        let bpm_mean = if ring.is_empty() {
            None
        } else {
            Some(trimmed_mean(&mut ring, 1))
        };

        let cores = match filter {
            Some(c) => {
                let mut z = [0u32; 3];
                z[c as usize] = self.color_counts[c as usize];
                z
            }
            None => self.color_counts,
        };
        let checkins_total = cores.iter().sum();

        let calm_norm = bucket.anxiety.norm().map(|a| (1.0 - a).clamp(0.0, 1.0));
        let energy_norm = bucket.energy.norm();
        let humor_norm = bucket.humor.norm();

        let mut total = 0.0;
        let mut n = 0u32;
        for part in [calm_norm, energy_norm, humor_norm].into_iter().flatten() {
            total += part;
            n += 1;
        }
        let wellbeing_norm = if n > 0 { Some(total / n as f32) } else { None };

        StatsSnapshot {
            bpm_mean,
            bpm_last: bucket.bpm_last,
            bpm_stddev,
            bpm_n,
            cores,
            checkins_total,
            anxiety_mean: bucket.anxiety.mean(),
            anxiety_n: bucket.anxiety.count,
            energy_mean: bucket.energy.mean(),
            energy_n: bucket.energy.count,
            humor_mean: bucket.humor.mean(),
            humor_n: bucket.humor.count,
            wellbeing_index: wellbeing_norm.map(|w| w * 100.0),
            calm_index: calm_norm.map(|c| c * 100.0),
        }
    }

    /// Write the aggregate CSV (header + one data line, CRLF terminated)
    /// into `dst`. Absent statistics are emitted as `0`. Returns the number
    /// of bytes written; output is truncated if `dst` is too small.
    pub fn dump_csv(
        &self,
        dst: &mut [u8],
    ) -> usize {
        use core::fmt::Write;

        let s = self.snapshot(None);
        let mut w = SliceWriter::new(dst);

        let _ = w.write_str(
            "bpm_mean,bpm_last,bpm_stddev,bpm_n,ans_mean,ans_n,energy_mean,energy_n,humor_mean,humor_n,cores_verde,cores_amarelo,cores_vermelho,wellbeing_index,calm_index\r\n",
        );
        let _ = write!(
            w,
            "{:.3},{:.3},{:.3},{},{:.3},{},{:.3},{},{:.3},{},{},{},{},{:.3},{:.3}\r\n",
            s.bpm_mean.unwrap_or(0.0),
            s.bpm_last.unwrap_or(0.0),
            s.bpm_stddev.unwrap_or(0.0),
            s.bpm_n,
            s.anxiety_mean.unwrap_or(0.0),
            s.anxiety_n,
            s.energy_mean.unwrap_or(0.0),
            s.energy_n,
            s.humor_mean.unwrap_or(0.0),
            s.humor_n,
            s.cores[0],
            s.cores[1],
            s.cores[2],
            s.wellbeing_index.unwrap_or(0.0),
            s.calm_index.unwrap_or(0.0),
        );
        w.written
    }
}

/// `core::fmt::Write` over a byte slice; excess output is dropped.
struct SliceWriter<'a> {
    dst: &'a mut [u8],
    written: usize,
}

impl<'a> SliceWriter<'a> {
    fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, written: 0 }
    }
}

impl core::fmt::Write for SliceWriter<'_> {
    fn write_str(
        &mut self,
        s: &str,
    ) -> core::fmt::Result {
        let room = self.dst.len() - self.written;
        let take = s.len().min(room);
        self.dst[self.written..self.written + take].copy_from_slice(&s.as_bytes()[..take]);
        self.written += take;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_mean_small_rings() {
        assert!(trimmed_mean(&mut [], 1).is_nan());
        assert_eq!(trimmed_mean(&mut [70.0], 1), 70.0);
        assert_eq!(trimmed_mean(&mut [60.0, 80.0], 1), 70.0);
    }

    #[test]
    fn test_trimmed_mean_drops_extremes() {
        // Inner mean after sorting: (70 + 72 + 74) / 3.
        let mut xs = [200.0, 70.0, 74.0, 10.0, 72.0];
        assert_eq!(trimmed_mean(&mut xs, 1), 72.0);
    }

    #[test]
    fn test_trimmed_mean_matches_inner_mean_law() {
        let mut xs = [5.0, 1.0, 3.0, 4.0, 2.0];
        let trimmed = trimmed_mean(&mut xs.clone(), 1);
        xs.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
        let inner: f32 = xs[1..4].iter().sum::<f32>() / 3.0;
        assert_eq!(trimmed, inner);
    }

    #[test]
    fn test_bpm_validation() {
        let mut st = StatsStore::new();
        st.add_bpm(0.0);
        st.add_bpm(-5.0);
        st.add_bpm(250.0);
        assert_eq!(st.snapshot(None).bpm_n, 0);

        st.add_bpm(72.0);
        let s = st.snapshot(None);
        assert_eq!(s.bpm_n, 1);
        assert_eq!(s.bpm_last, Some(72.0));
    }

    #[test]
    fn test_bpm_ring_drops_oldest() {
        let mut st = StatsStore::new();
        for i in 0..(BPM_RING_LEN + 8) {
            st.add_bpm(60.0 + i as f32 * 0.1);
        }
        let s = st.snapshot(None);
        assert_eq!(s.bpm_n, BPM_RING_LEN as u32);
        assert_eq!(s.bpm_last, Some(60.0 + (BPM_RING_LEN + 7) as f32 * 0.1));
    }

    #[test]
    fn test_level_validation() {
        let mut st = StatsStore::new();
        st.add_anxiety(0);
        st.add_anxiety(5);
        assert_eq!(st.snapshot(None).anxiety_n, 0);
        st.add_anxiety(2);
        st.add_anxiety(4);
        let s = st.snapshot(None);
        assert_eq!(s.anxiety_n, 2);
        assert_eq!(s.anxiety_mean, Some(3.0));
    }

    #[test]
    fn test_color_routing_mirrors_overall() {
        let mut st = StatsStore::new();
        st.set_current_color(Some(TriageColor::Red));
        st.add_bpm(88.0);
        st.add_anxiety(3);
        st.add_energy(2);
        st.add_humor(4);
        st.set_current_color(None);

        // Recorded after the latch cleared: overall only.
        st.add_bpm(61.0);

        let red = st.snapshot(Some(TriageColor::Red));
        assert_eq!(red.bpm_n, 1);
        assert_eq!(red.bpm_last, Some(88.0));
        assert_eq!(red.anxiety_n, 1);
        assert_eq!(red.energy_n, 1);
        assert_eq!(red.humor_n, 1);

        let overall = st.snapshot(None);
        assert_eq!(overall.bpm_n, 2);

        let green = st.snapshot(Some(TriageColor::Green));
        assert_eq!(green.bpm_n, 0);
        assert_eq!(green.anxiety_n, 0);
    }

    #[test]
    fn test_color_filter_zeroes_other_counts() {
        let mut st = StatsStore::new();
        st.inc_color(TriageColor::Green);
        st.inc_color(TriageColor::Green);
        st.inc_color(TriageColor::Red);

        let all = st.snapshot(None);
        assert_eq!(all.cores, [2, 0, 1]);
        assert_eq!(all.checkins_total, 3);

        let green = st.snapshot(Some(TriageColor::Green));
        assert_eq!(green.cores, [2, 0, 0]);
        assert_eq!(green.checkins_total, 2);
    }

    #[test]
    fn test_snapshot_idempotent() {
        let mut st = StatsStore::new();
        st.add_bpm(70.0);
        st.add_bpm(75.0);
        st.add_bpm(80.0);
        st.inc_color(TriageColor::Yellow);
        st.add_anxiety(2);

        assert_eq!(st.snapshot(None), st.snapshot(None));
        assert_eq!(
            st.snapshot(Some(TriageColor::Yellow)),
            st.snapshot(Some(TriageColor::Yellow))
        );
    }

    #[test]
    fn test_derived_indices() {
        let mut st = StatsStore::new();
        // Anxiety 1 => calm 100.
        st.add_anxiety(1);
        let s = st.snapshot(None);
        assert_eq!(s.calm_index, Some(100.0));
        // Only calm present: wellbeing equals calm.
        assert_eq!(s.wellbeing_index, Some(100.0));

        // Energy 4 => energy_norm 1; humor 1 => humor_norm 0.
        st.add_energy(4);
        st.add_humor(1);
        let s = st.snapshot(None);
        // wellbeing = (1 + 1 + 0) / 3.
        let w = s.wellbeing_index.unwrap();
        assert!((w - 66.6667).abs() < 0.01, "wellbeing {w}");
    }

    #[test]
    fn test_indices_absent_without_samples() {
        let st = StatsStore::new();
        let s = st.snapshot(None);
        assert_eq!(s.calm_index, None);
        assert_eq!(s.wellbeing_index, None);
        assert_eq!(s.bpm_mean, None);
        assert_eq!(s.bpm_stddev, None);
    }

    #[test]
    fn test_stddev_needs_two_samples() {
        let mut st = StatsStore::new();
        st.add_bpm(70.0);
        assert_eq!(st.snapshot(None).bpm_stddev, None);
        st.add_bpm(80.0);
        let sd = st.snapshot(None).bpm_stddev.unwrap();
        // Bessel-corrected: sqrt(((70-75)^2 + (80-75)^2) / 1).
        assert!((sd - 7.0711).abs() < 0.001, "stddev {sd}");
    }

    #[test]
    fn test_csv_shape() {
        let mut st = StatsStore::new();
        st.add_bpm(70.0);
        st.add_bpm(75.0);
        st.add_bpm(80.0);
        st.inc_color(TriageColor::Green);
        st.add_anxiety(2);

        let mut buf = [0u8; 512];
        let n = st.dump_csv(&mut buf);
        let text = core::str::from_utf8(&buf[..n]).unwrap();

        let mut lines = text.split("\r\n");
        let header = lines.next().unwrap();
        let data = lines.next().unwrap();
        assert_eq!(lines.next(), Some("")); // trailing CRLF
        assert_eq!(header.split(',').count(), 15);
        assert_eq!(data.split(',').count(), 15);

        let fields: heapless::Vec<&str, 15> = data.split(',').collect();
        assert_eq!(fields[0], "75.000"); // trimmed mean
        assert_eq!(fields[1], "80.000"); // last
        assert_eq!(fields[3], "3"); // bpm_n
        assert_eq!(fields[4], "2.000"); // ans_mean
        assert_eq!(fields[10], "1"); // cores_verde
    }

    #[test]
    fn test_csv_absent_fields_are_zero() {
        let st = StatsStore::new();
        let mut buf = [0u8; 512];
        let n = st.dump_csv(&mut buf);
        let text = core::str::from_utf8(&buf[..n]).unwrap();
        let data = text.split("\r\n").nth(1).unwrap();
        let fields: heapless::Vec<&str, 15> = data.split(',').collect();
        assert_eq!(fields[0], "0.000");
        assert_eq!(fields[13], "0.000"); // wellbeing_index
        assert_eq!(fields[14], "0.000"); // calm_index
    }

    #[test]
    fn test_wire_names_round_trip() {
        for c in TriageColor::ALL {
            assert_eq!(TriageColor::from_wire(c.wire_name()), Some(c));
        }
        assert_eq!(TriageColor::from_wire("azul"), None);
    }
}
