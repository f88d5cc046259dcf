#![forbid(unsafe_code)]

use crate::{error::Error, session::SessionSet, store::EncounterStore};
use async_trait::async_trait;
use tracing::{debug, info};

/// Receives each finished session, e.g. to post it somewhere.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// `store` holds the history to compare kill times against, when kept.
    async fn publish(&self, set: &SessionSet, store: Option<&EncounterStore>) -> Result<(), Error>;
}

/// Writes sessions to the log, flagging kills that beat every earlier day.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl SessionSink for TracingSink {
    async fn publish(&self, set: &SessionSet, store: Option<&EncounterStore>) -> Result<(), Error> {
        if set.is_empty() {
            debug!("empty session, nothing to publish");
            return Ok(());
        }
        let title = set.title().unwrap_or_default();
        info!(%title, date = ?set.date(), "session");

        for group in set.groups().iter().filter(|g| !g.is_empty()) {
            for bucket in group.encounters().iter().filter(|b| !b.is_empty()) {
                info!(
                    group = %group.name,
                    encounter = %bucket.name,
                    successes = bucket.successes().len(),
                    failures = bucket.failures().len(),
                    "encounter"
                );

                for log in bucket.successes() {
                    let Some(time) = log.accurate_duration() else {
                        info!(permalink = %log.permalink, "kill");
                        continue;
                    };
                    let Some(store) = store else {
                        info!(permalink = %log.permalink, %time, "kill");
                        continue;
                    };

                    // only history from before the day of this kill counts
                    let before = crate::store::local_midnight(log.encounter_time);
                    let delta = store
                        .compare_time(time, &log.encounter.boss, log.encounter.is_cm, None, Some(before))
                        .await?;
                    if delta.is_negative() {
                        info!(permalink = %log.permalink, %time, %delta, "new personal best");
                    } else {
                        info!(permalink = %log.permalink, %time, %delta, "kill");
                    }
                }

                for log in bucket.failures() {
                    info!(permalink = %log.permalink, "attempt");
                }
            }
        }
        Ok(())
    }
}
