#![forbid(unsafe_code)]

use super::repo::{EncounterStore, StoredEncounter};
use crate::{
    error::Error,
    record::{Encounter, LogRecord},
    session::SessionSet,
    sink::SessionSink,
};
use chrono::{DateTime, Local, TimeDelta, Utc};
use tracing::{Instrument, info, info_span, warn};

impl EncounterStore {
    /// Walk the history one calendar day at a time, classify each day's rows
    /// into `set` and hand every non-empty day to `sink`.
    ///
    /// Without `start` the walk begins at local midnight of the oldest row;
    /// without `end` it stops now. Days are half-open, `[day, day + 1)`.
    /// Returns how many sessions were published.
    pub async fn replay_history(
        &self,
        set: &mut SessionSet,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        sink: &dyn SessionSink,
    ) -> Result<usize, Error> {
        let start = match start {
            Some(start) => start,
            None => match self.earliest_date().await? {
                Some(earliest) => local_midnight(earliest),
                None => return Ok(0),
            },
        };
        let end = end.unwrap_or_else(Utc::now);
        let step = TimeDelta::days(1);

        let mut published = 0;
        let mut day = start;
        while day < end {
            let next = day + step;
            let logs = self
                .rows_between(day, next)
                .await?
                .into_iter()
                .filter_map(|row| restore(set, row))
                .collect::<Vec<_>>();

            if logs.is_empty() {
                day = next;
                continue;
            }

            set.clear();
            set.fill_from_logs(logs, true);
            // rows of encounters outside the set leave it empty
            if !set.is_empty() {
                let session: &SessionSet = set;
                let span = info_span!("session", from = %day.to_rfc3339(), to = %next.to_rfc3339());
                async {
                    info!("replaying\n{session}");
                    sink.publish(session, Some(self)).await
                }
                .instrument(span)
                .await?;
                published += 1;
            }

            day = next;
        }

        Ok(published)
    }
}

/// Rebuild a lightweight record from a persisted row, mapping the boss name
/// back to the first target id of its encounter.
fn restore(set: &SessionSet, row: StoredEncounter) -> Option<LogRecord> {
    let (Some(date), Some(boss)) = (row.date, row.boss.as_deref()) else {
        warn!(permalink = %row.permalink, "row is incomplete, heal it first");
        return None;
    };
    let catalog = set.catalog();
    let boss_id = match catalog
        .resolve_by_name(boss)
        .and_then(|key| catalog.ids_for_key(key))
    {
        Ok(ids) => ids.first().copied()?,
        Err(err) => {
            warn!(permalink = %row.permalink, %err, "skipping row");
            return None;
        }
    };

    let encounter = Encounter {
        success: row.success.unwrap_or(false),
        is_cm: row.cm.unwrap_or(false),
        boss_id,
        boss: boss.to_owned(),
        ..Default::default()
    };
    Some(LogRecord::restored(row.permalink, date, encounter, row.time))
}

/// Midnight of the local calendar day containing `at`.
pub(crate) fn local_midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_midnight_is_not_after_input() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let midnight = local_midnight(at);
        assert!(midnight <= at);
        assert!(at - midnight < TimeDelta::days(1));
        assert_eq!(local_midnight(midnight), midnight);
    }
}
