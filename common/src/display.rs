//! The four-line kiosk display state.
//!
//! The orchestrator is the only writer; the OLED renderer and the web
//! mirror (`/display`, `/oled.json`) read it. Lines are bounded and updated
//! atomically via [`DisplayLines::set`], which also tracks a dirty flag so
//! the renderer only redraws on change.

use heapless::String;

use crate::config::DISPLAY_LINE_LEN;

/// One bounded display line.
pub type Line = String<DISPLAY_LINE_LEN>;

/// Four text lines plus a dirty flag.
#[derive(Default)]
pub struct DisplayLines {
    lines: [Line; 4],
    dirty: bool,
}

impl DisplayLines {
    pub fn new() -> Self { Self::default() }

    /// Replace all four lines at once. Overlong input is truncated at the
    /// line capacity.
    pub fn set(
        &mut self,
        l1: &str,
        l2: &str,
        l3: &str,
        l4: &str,
    ) {
        for (slot, text) in self.lines.iter_mut().zip([l1, l2, l3, l4]) {
            slot.clear();
            for ch in text.chars() {
                if slot.push(ch).is_err() {
                    break;
                }
            }
        }
        self.dirty = true;
    }

    /// Owned copy of the lines, for rendering outside the state lock.
    pub fn copy_lines(&self) -> [Line; 4] { self.lines.clone() }

    /// The current lines, top to bottom.
    pub fn lines(&self) -> [&str; 4] {
        [
            self.lines[0].as_str(),
            self.lines[1].as_str(),
            self.lines[2].as_str(),
            self.lines[3].as_str(),
        ]
    }

    /// True if the lines changed since the last [`Self::clear_dirty`].
    pub const fn is_dirty(&self) -> bool { self.dirty }

    /// Mark the current content as rendered.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read_back() {
        let mut d = DisplayLines::new();
        d.set("TheraLink", "A=start", "B=back", "");
        assert_eq!(d.lines(), ["TheraLink", "A=start", "B=back", ""]);
    }

    #[test]
    fn test_overlong_line_truncates() {
        let mut d = DisplayLines::new();
        let long = "abcdefghijklmnopqrstuvwxyz";
        d.set(long, "", "", "");
        assert_eq!(d.lines()[0].len(), DISPLAY_LINE_LEN);
        assert!(long.starts_with(d.lines()[0]));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut d = DisplayLines::new();
        assert!(!d.is_dirty());
        d.set("x", "", "", "");
        assert!(d.is_dirty());
        d.clear_dirty();
        assert!(!d.is_dirty());
    }
}
