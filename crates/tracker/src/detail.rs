#![forbid(unsafe_code)]

use crate::{error::Error, log_time::LogTime};
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Buff id of the Emboldened easy-mode buff.
pub const EMBOLDENED_ID: i64 = 68087;

/// Per-log analysis document. Large, fetched on demand, read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail(Value);

impl Detail {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        Ok(Self(serde_json::from_slice(body)?))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Kill time. The textual `duration` field is authoritative; newer
    /// payloads also carry `durationMS`, used when the text is absent.
    pub fn duration(&self) -> Result<LogTime, Error> {
        if let Some(text) = self.0.get("duration").and_then(Value::as_str) {
            return text.parse();
        }
        self.0
            .get("durationMS")
            .and_then(Value::as_i64)
            .map(LogTime::from_ms)
            .ok_or(Error::MissingField("duration"))
    }

    /// Health left on each boss target, in the order targets appear.
    /// Trash targets (negative ids) and ids outside `allowed` are skipped.
    pub fn remaining_health(&self, allowed: &[u32]) -> Vec<f64> {
        let Some(targets) = self.0.get("targets").and_then(Value::as_array) else {
            return Vec::new();
        };
        targets
            .iter()
            .filter(|target| {
                target
                    .get("id")
                    .and_then(Value::as_i64)
                    .and_then(|id| u32::try_from(id).ok())
                    .is_some_and(|id| allowed.contains(&id))
            })
            .map(|target| {
                let burned = target
                    .get("healthPercentBurned")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                100.0 - burned
            })
            .collect()
    }

    /// Highest Emboldened stack count over all players and phases; 0 if none.
    pub fn emboldened_stacks(&self) -> u32 {
        let Some(players) = self.0.get("players").and_then(Value::as_array) else {
            return 0;
        };
        let mut max: f64 = 0.0;
        for player in players {
            // payloads without the flag predate npc tracking; skip them too
            match player.get("friendlyNPC").and_then(Value::as_bool) {
                Some(false) => {}
                _ => continue,
            }
            let buffs = player.get("buffUptimes").and_then(Value::as_array);
            for buff in buffs.into_iter().flatten() {
                if buff.get("id").and_then(Value::as_i64) != Some(EMBOLDENED_ID) {
                    continue;
                }
                let phases = buff.get("buffData").and_then(Value::as_array);
                for phase in phases.into_iter().flatten() {
                    if let Some(uptime) = phase.get("uptime").and_then(Value::as_f64) {
                        max = max.max(uptime);
                    }
                }
            }
        }
        max.round() as u32
    }

    /// Wall-clock start and end of the fight.
    pub fn start_end(&self) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), Error> {
        let standard = self
            .timestamp("timeStartStd", "")
            .and_then(|start| Ok((start, self.timestamp("timeEndStd", "")?)));
        match standard {
            Ok(times) => Ok(times),
            // older payloads print the offset without minutes, e.g. "+02"
            Err(_) => Ok((
                self.timestamp("timeStart", ":00")?,
                self.timestamp("timeEnd", ":00")?,
            )),
        }
    }

    fn timestamp(&self, field: &'static str, suffix: &str) -> Result<DateTime<FixedOffset>, Error> {
        let text = self
            .0
            .get(field)
            .and_then(Value::as_str)
            .ok_or(Error::MissingField(field))?;
        let text = format!("{text}{suffix}");
        DateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S %:z")
            .map_err(|_| Error::InvalidTimestamp(text))
    }
}
