//! HTTP request parsing and routing for the kiosk web surface.
//!
//! Only the request line matters: every route is a GET and all parameters
//! travel in the query string. Unknown paths fall through to the
//! professional dashboard, which keeps captive-portal probes landing
//! somewhere useful.

use theralink_common::stats::TriageColor;

/// Decoded request target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Route {
    /// `/`: professional dashboard.
    Dashboard,
    /// `/display`: kiosk display mirror.
    DisplayMirror,
    /// `/oled.json`
    OledJson,
    /// `/survey`: the ten-question form.
    Survey,
    /// `/survey_submit?ans=##########`; `None` when the answer string is
    /// missing or malformed.
    SurveySubmit(Option<u16>),
    /// `/survey_state.json`
    SurveyStateJson,
    /// `/stats.json[?color=...]`
    StatsJson(Option<TriageColor>),
    /// `/download.csv`
    DownloadCsv,
}

/// Route an HTTP request from its raw first bytes.
///
/// Anything that is not a well-formed GET goes to the dashboard, matching
/// the forgiving behavior expected from a captive portal.
pub fn route(request: &str) -> Route {
    let Some(target) = request_target(request) else {
        return Route::Dashboard;
    };
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };

    match path {
        "/display" => Route::DisplayMirror,
        "/oled.json" => Route::OledJson,
        "/survey" => Route::Survey,
        "/survey_submit" => Route::SurveySubmit(parse_ans(query)),
        "/survey_state.json" => Route::SurveyStateJson,
        "/stats.json" => Route::StatsJson(parse_color(query)),
        "/download.csv" => Route::DownloadCsv,
        _ => Route::Dashboard,
    }
}

/// Extract the request target from `GET <target> HTTP/1.1`.
fn request_target(request: &str) -> Option<&str> {
    let rest = request.strip_prefix("GET ")?;
    let line = rest.split(['\r', '\n']).next()?;
    let target = line.split(' ').next()?;
    if target.starts_with('/') { Some(target) } else { None }
}

/// Parse `ans=##########` out of a query string: exactly ten `0`/`1`
/// characters, packed LSB-first (bit *i* = question *i*).
pub fn parse_ans(query: &str) -> Option<u16> {
    let value = query_value(query, "ans")?;
    let mut bits = 0u16;
    let mut count = 0usize;
    for ch in value.chars() {
        match ch {
            '0' => {}
            '1' => bits |= 1 << count,
            _ => break,
        }
        count += 1;
        if count > 10 {
            return None;
        }
    }
    if count == 10 { Some(bits) } else { None }
}

/// Parse an optional `color=` filter.
pub fn parse_color(query: &str) -> Option<TriageColor> {
    TriageColor::from_wire(query_value(query, "color")?)
}

/// Value of `key=` in a query string (up to the next `&`).
fn query_value<'a>(
    query: &'a str,
    key: &str,
) -> Option<&'a str> {
    for pair in query.split('&') {
        if let Some(v) = pair.strip_prefix(key)
            && let Some(v) = v.strip_prefix('=')
        {
            return Some(v);
        }
    }
    None
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_known_paths() {
        assert_eq!(route("GET / HTTP/1.1\r\n"), Route::Dashboard);
        assert_eq!(route("GET /display HTTP/1.1\r\n"), Route::DisplayMirror);
        assert_eq!(route("GET /oled.json HTTP/1.1\r\n"), Route::OledJson);
        assert_eq!(route("GET /survey HTTP/1.1\r\n"), Route::Survey);
        assert_eq!(route("GET /survey_state.json HTTP/1.1\r\n"), Route::SurveyStateJson);
        assert_eq!(route("GET /download.csv HTTP/1.1\r\n"), Route::DownloadCsv);
    }

    #[test]
    fn test_unknown_path_serves_dashboard() {
        assert_eq!(route("GET /generate_204 HTTP/1.1\r\n"), Route::Dashboard);
        assert_eq!(route("GET /hotspot-detect.html HTTP/1.1\r\n"), Route::Dashboard);
        assert_eq!(route("POST /survey_submit HTTP/1.1\r\n"), Route::Dashboard);
        assert_eq!(route("garbage"), Route::Dashboard);
    }

    #[test]
    fn test_cache_buster_query_ignored() {
        assert_eq!(route("GET /oled.json?t=123 HTTP/1.1\r\n"), Route::OledJson);
        assert_eq!(route("GET /stats.json?t=99 HTTP/1.1\r\n"), Route::StatsJson(None));
    }

    #[test]
    fn test_stats_color_filter() {
        assert_eq!(
            route("GET /stats.json?color=verde HTTP/1.1\r\n"),
            Route::StatsJson(Some(TriageColor::Green))
        );
        assert_eq!(
            route("GET /stats.json?t=1&color=amarelo HTTP/1.1\r\n"),
            Route::StatsJson(Some(TriageColor::Yellow))
        );
        assert_eq!(
            route("GET /stats.json?color=vermelho&t=2 HTTP/1.1\r\n"),
            Route::StatsJson(Some(TriageColor::Red))
        );
        assert_eq!(route("GET /stats.json?color=rosa HTTP/1.1\r\n"), Route::StatsJson(None));
    }

    #[test]
    fn test_submit_parses_ten_bits() {
        assert_eq!(
            route("GET /survey_submit?ans=1000000001 HTTP/1.1\r\n"),
            Route::SurveySubmit(Some(0b10_0000_0001))
        );
        assert_eq!(
            route("GET /survey_submit?ans=0000000000&t=5 HTTP/1.1\r\n"),
            Route::SurveySubmit(Some(0))
        );
    }

    #[test]
    fn test_submit_bit_order_is_lsb_first() {
        // Leftmost character is question 1 = bit 0.
        assert_eq!(parse_ans("ans=1000000000"), Some(1));
        assert_eq!(parse_ans("ans=0000000001"), Some(1 << 9));
    }

    #[test]
    fn test_malformed_ans_rejected() {
        assert_eq!(parse_ans(""), None);
        assert_eq!(parse_ans("ans="), None);
        assert_eq!(parse_ans("ans=101"), None); // too short
        assert_eq!(parse_ans("ans=10101010101"), None); // too long
        assert_eq!(parse_ans("ans=10x0101010"), None); // junk inside
        assert_eq!(parse_ans("t=12"), None); // missing key
        // Ten valid bits followed by a separator are fine.
        assert_eq!(parse_ans("ans=1111111111&t=3"), Some(0x3FF));
    }

    #[test]
    fn test_query_value_picks_right_key() {
        assert_eq!(query_value("a=1&ans=00&b=2", "ans"), Some("00"));
        assert_eq!(query_value("answer=1", "ans"), None);
    }
}
