//! JSON body builders for the web surface.
//!
//! These produce only response *bodies*; HTTP status lines and headers are
//! the transport layer's business. Absent statistics are emitted as `null`,
//! except `bpm_mean` which the dashboard expects as `0` when no samples
//! exist yet.

use core::fmt::{self, Write};

use crate::stats::StatsSnapshot;
use crate::survey::SurveyAgg;

/// Indices of the alert questions in the canonical survey order.
const Q_CRISIS: usize = 7;
const Q_AVOID: usize = 8;
const Q_TALK: usize = 9;
/// Indices of the positively-phrased basic-needs questions.
const Q_MEAL: usize = 1;
const Q_SLEEP: usize = 2;

fn write_opt3(
    out: &mut impl Write,
    v: Option<f32>,
) -> fmt::Result {
    match v {
        Some(x) => write!(out, "{x:.3}"),
        None => out.write_str("null"),
    }
}

/// Body of `/stats.json`. The survey aggregate must come from the same
/// color filter as the snapshot.
pub fn write_stats_json(
    out: &mut impl Write,
    s: &StatsSnapshot,
    svy: &SurveyAgg,
) -> fmt::Result {
    let n = svy.n;
    let sum_yes: u32 = svy.yes.iter().sum();
    let avg_yes = if n > 0 { sum_yes as f32 / n as f32 } else { 0.0 };

    let engagement = if s.checkins_total > 0 {
        Some((n as f32 / s.checkins_total as f32).min(1.0))
    } else {
        None
    };

    // Positively-phrased questions: the alert is the "no" count.
    let no_meal = n.saturating_sub(svy.yes[Q_MEAL]);
    let poor_sleep = n.saturating_sub(svy.yes[Q_SLEEP]);

    write!(out, "{{\"bpm_mean\":{:.3},\"bpm_n\":{},", s.bpm_mean.unwrap_or(0.0), s.bpm_n)?;
    out.write_str("\"bpm_last\":")?;
    write_opt3(out, s.bpm_last)?;
    out.write_str(",\"bpm_stddev\":")?;
    write_opt3(out, s.bpm_stddev)?;
    out.write_str(",\"wellbeing_index\":")?;
    write_opt3(out, s.wellbeing_index)?;
    out.write_str(",\"calm_index\":")?;
    write_opt3(out, s.calm_index)?;
    match engagement {
        Some(e) => write!(out, ",\"engagement_rate\":{e:.4}")?,
        None => out.write_str(",\"engagement_rate\":null")?,
    }
    write!(
        out,
        ",\"checkins_total\":{},\"cores\":{{\"verde\":{},\"amarelo\":{},\"vermelho\":{}}}",
        s.checkins_total, s.cores[0], s.cores[1], s.cores[2]
    )?;

    write!(out, ",\"survey\":{{\"n\":{n},\"yes\":[")?;
    for (i, y) in svy.yes.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write!(out, "{y}")?;
    }
    out.write_str("],\"rate\":[")?;
    for (i, y) in svy.yes.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        let rate = if n > 0 { *y as f32 / n as f32 } else { 0.0 };
        write!(out, "{rate:.4}")?;
    }
    write!(
        out,
        "],\"avg_yes\":{avg_yes:.3},\"last_bits\":{},\"alerts\":{{\"crisis\":{},\"avoid\":{},\"talk\":{}}},\"basic\":{{\"no_meal\":{no_meal},\"poor_sleep\":{poor_sleep}}}}}}}",
        svy.last_bits, svy.yes[Q_CRISIS], svy.yes[Q_AVOID], svy.yes[Q_TALK]
    )
}

/// Body of `/oled.json`: the four mirrored display lines.
pub fn write_oled_json(
    out: &mut impl Write,
    lines: [&str; 4],
) -> fmt::Result {
    out.write_str("{")?;
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write!(out, "\"l{}\":\"", i + 1)?;
        write_escaped(out, line)?;
        out.write_char('"')?;
    }
    out.write_str("}")
}

/// Body of `/survey_state.json`.
pub fn write_survey_state_json(
    out: &mut impl Write,
    mode: bool,
) -> fmt::Result {
    write!(out, "{{\"mode\":{}}}", u8::from(mode))
}

fn write_escaped(
    out: &mut impl Write,
    s: &str,
) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            c if (c as u32) < 0x20 => {}
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{StatsStore, TriageColor};
    use crate::survey::SurveyBoard;

    fn render_stats(
        store: &StatsStore,
        board: &SurveyBoard,
        filter: Option<TriageColor>,
    ) -> std::string::String {
        let mut out = std::string::String::new();
        write_stats_json(&mut out, &store.snapshot(filter), board.agg(filter)).unwrap();
        out
    }

    #[test]
    fn test_empty_stats_json() {
        let json = render_stats(&StatsStore::new(), &SurveyBoard::new(), None);
        assert!(json.starts_with("{\"bpm_mean\":0.000,\"bpm_n\":0,"));
        assert!(json.contains("\"bpm_last\":null"));
        assert!(json.contains("\"engagement_rate\":null"));
        assert!(json.contains("\"cores\":{\"verde\":0,\"amarelo\":0,\"vermelho\":0}"));
        assert!(json.contains("\"yes\":[0,0,0,0,0,0,0,0,0,0]"));
        assert!(json.ends_with("}"));
    }

    #[test]
    fn test_stats_json_survey_section() {
        let mut store = StatsStore::new();
        let mut board = SurveyBoard::new();
        store.inc_color(TriageColor::Red);
        let bits = (1 << Q_CRISIS) | (1 << Q_TALK); // crisis + wants to talk
        board.submit(bits);

        let json = render_stats(&store, &board, None);
        assert!(json.contains("\"checkins_total\":1"));
        assert!(json.contains("\"engagement_rate\":1.0000"));
        assert!(json.contains("\"alerts\":{\"crisis\":1,\"avoid\":0,\"talk\":1}"));
        // Meal and sleep answered "no": both basic alerts fire.
        assert!(json.contains("\"basic\":{\"no_meal\":1,\"poor_sleep\":1}"));
        assert!(json.contains("\"avg_yes\":2.000"));
        assert!(json.contains(&std::format!("\"last_bits\":{bits}")));
    }

    #[test]
    fn test_stats_json_color_filter_uses_color_buckets() {
        let mut store = StatsStore::new();
        let mut board = SurveyBoard::new();

        let t = board.submit(0b10); // ate well, nothing else
        store.set_current_color(Some(TriageColor::Green));
        store.add_bpm(70.0);
        store.set_current_color(None);
        store.inc_color(TriageColor::Green);
        board.assign(t, TriageColor::Green);

        let json = render_stats(&store, &board, Some(TriageColor::Green));
        assert!(json.contains("\"bpm_n\":1"));
        assert!(json.contains("\"survey\":{\"n\":1,"));
        assert!(json.contains("\"basic\":{\"no_meal\":0,\"poor_sleep\":1}"));

        let yellow = render_stats(&store, &board, Some(TriageColor::Yellow));
        assert!(yellow.contains("\"bpm_n\":0"));
        assert!(yellow.contains("\"survey\":{\"n\":0,"));
    }

    #[test]
    fn test_engagement_clamped_to_one() {
        let mut store = StatsStore::new();
        let mut board = SurveyBoard::new();
        store.inc_color(TriageColor::Green);
        board.submit(0);
        board.submit(0);
        let json = render_stats(&store, &board, None);
        assert!(json.contains("\"engagement_rate\":1.0000"));
    }

    #[test]
    fn test_oled_json_mirrors_lines() {
        let mut out = std::string::String::new();
        write_oled_json(&mut out, ["TheraLink", "BPM: 72", "", "A: continue"]).unwrap();
        assert_eq!(
            out,
            "{\"l1\":\"TheraLink\",\"l2\":\"BPM: 72\",\"l3\":\"\",\"l4\":\"A: continue\"}"
        );
    }

    #[test]
    fn test_oled_json_escapes_quotes() {
        let mut out = std::string::String::new();
        write_oled_json(&mut out, ["say \"hi\"", "", "", ""]).unwrap();
        assert!(out.contains("say \\\"hi\\\""));
    }

    #[test]
    fn test_survey_state_json() {
        let mut out = std::string::String::new();
        write_survey_state_json(&mut out, true).unwrap();
        assert_eq!(out, "{\"mode\":1}");
        out.clear();
        write_survey_state_json(&mut out, false).unwrap();
        assert_eq!(out, "{\"mode\":0}");
    }
}
