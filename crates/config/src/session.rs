#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Session {
    /// Root folder holding one sub-folder per boss.
    pub log_folder: Option<PathBuf>,

    /// Whether failed attempts are classified alongside kills.
    pub include_failures: bool,

    /// How far back to look for fresh logs. Can be fractional.
    pub cutoff_hours: f64,

    /// Encounter set used when none is named on the command line.
    pub encounter_set: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            log_folder: None,
            include_failures: true,
            cutoff_hours: 3.0,
            encounter_set: None,
        }
    }
}

impl Session {
    pub fn cutoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.cutoff_hours.max(0.0) * 3600.0).unwrap_or(Duration::ZERO)
    }
}
