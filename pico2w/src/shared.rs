//! Kiosk state shared between the main poll loop and the web surface.
//!
//! The store, the survey board and the display lines are owned by one
//! blocking mutex. HTTP/DNS handlers and the main loop take the lock for
//! short, non-awaiting sections only; everything they produce (response
//! bodies, display line copies) is staged outside the lock.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use theralink_common::display::DisplayLines;
use theralink_common::stats::StatsStore;
use theralink_common::survey::SurveyBoard;

/// Everything the web surface reads or writes.
pub struct Kiosk {
    pub stats: StatsStore,
    pub survey: SurveyBoard,
    pub display: DisplayLines,
}

impl Kiosk {
    pub fn new() -> Self {
        Self {
            stats: StatsStore::new(),
            survey: SurveyBoard::new(),
            display: DisplayLines::new(),
        }
    }
}

impl Default for Kiosk {
    fn default() -> Self { Self::new() }
}

/// Shared handle passed to the network tasks.
pub type SharedKiosk = Mutex<CriticalSectionRawMutex, RefCell<Kiosk>>;
