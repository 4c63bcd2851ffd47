use gloo_storage::{LocalStorage, Storage};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::timefmt::HourFormat;

const PREFS_KEY: &str = "mylatitude_display";

/// Display choices remembered in the browser between visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPrefs {
    pub use_24_hour: bool,
}

impl DisplayPrefs {
    /// Stored preferences, or `fallback` when nothing was saved yet.
    pub fn load_or(fallback: DisplayPrefs) -> Self {
        LocalStorage::get::<DisplayPrefs>(PREFS_KEY).unwrap_or(fallback)
    }

    pub fn save(&self) {
        if let Err(e) = LocalStorage::set(PREFS_KEY, self) {
            warn!("Failed to save display preferences: {}", e);
        }
    }

    pub fn hour_format(&self) -> HourFormat {
        HourFormat::from_24_hour_flag(self.use_24_hour)
    }
}
