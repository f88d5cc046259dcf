#![forbid(unsafe_code)]

use crate::{detail::Detail, error::Error, log_time::LogTime, source::LogSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::{collections::BTreeMap, fmt, sync::Arc};

const PERMALINK_HOST: &str = "https://dps.report/";

/// How a log is addressed on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogRef {
    Id(String),
    Permalink(String),
}

impl LogRef {
    /// Query parameter pair selecting this log.
    pub fn query(&self) -> (&'static str, &str) {
        match self {
            Self::Id(id) => ("id", id),
            Self::Permalink(link) => ("permalink", link),
        }
    }

    pub fn as_str(&self) -> &str {
        self.query().1
    }
}

impl fmt::Display for LogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Evtc {
    pub version: String,
    pub boss_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Player {
    pub display_name: String,
    pub character_name: String,
    pub profession: i64,
    pub elite_spec: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Encounter {
    pub unique_id: Option<String>,
    pub success: bool,
    /// Summary duration in seconds. Imprecise; see [`LogRecord::accurate_duration`].
    pub duration: i64,
    pub comp_dps: i64,
    pub number_of_players: i64,
    pub number_of_groups: i64,
    /// Target id the log was recorded against.
    pub boss_id: u32,
    /// Display name reported by the service.
    pub boss: String,
    #[serde(deserialize_with = "null_as_false")]
    pub is_cm: bool,
    pub gw2_build: i64,
    pub json_available: bool,
}

/// One uploaded log as reported by the service.
///
/// Two derived values are cached on the record: the detail payload and the
/// accurate duration parsed from it. Both are filled by consuming the record
/// and returning an updated copy, never through shared mutation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogRecord {
    pub id: String,
    pub permalink: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub upload_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub encounter_time: DateTime<Utc>,
    pub generator: String,
    pub generator_id: i64,
    pub generator_version: i64,
    pub language: String,
    pub language_id: i64,
    pub evtc: Evtc,
    pub players: BTreeMap<String, Player>,
    pub encounter: Encounter,

    #[serde(skip)]
    detail: Option<Arc<Detail>>,
    #[serde(skip)]
    accurate_duration: Option<LogTime>,
}

impl LogRecord {
    /// Parse one metadata document.
    pub fn from_metadata(body: &[u8]) -> Result<Self, Error> {
        let mut record: Self = serde_json::from_slice(body)?;
        record.fill_id();
        Ok(record)
    }

    /// The service omits the id on some responses; it is the permalink's stem.
    pub(crate) fn fill_id(&mut self) {
        if self.id.is_empty() {
            self.id = id_from_permalink(&self.permalink);
        }
    }

    /// A record rebuilt from persisted fields, with its duration already known.
    pub fn restored(
        permalink: impl Into<String>,
        encounter_time: DateTime<Utc>,
        encounter: Encounter,
        duration: Option<LogTime>,
    ) -> Self {
        let permalink = permalink.into();
        Self {
            id: id_from_permalink(&permalink),
            permalink,
            encounter_time,
            encounter,
            accurate_duration: duration,
            ..Default::default()
        }
    }

    /// Prefer the id; fall back to the permalink.
    pub fn log_ref(&self) -> LogRef {
        if self.id.is_empty() {
            LogRef::Permalink(self.permalink.clone())
        } else {
            LogRef::Id(self.id.clone())
        }
    }

    pub fn detail(&self) -> Option<&Arc<Detail>> {
        self.detail.as_ref()
    }

    pub fn accurate_duration(&self) -> Option<LogTime> {
        self.accurate_duration
    }

    /// Attach a fetched detail payload, deriving the accurate duration from it
    /// when possible.
    pub fn with_detail(mut self, detail: Arc<Detail>) -> Self {
        if self.accurate_duration.is_none() {
            self.accurate_duration = detail.duration().ok();
        }
        self.detail = Some(detail);
        self
    }

    /// Return the record with its accurate duration resolved, fetching the
    /// detail payload through `source` only if neither is cached yet.
    pub async fn resolve_duration<S>(mut self, source: &S) -> Result<Self, Error>
    where
        S: LogSource + ?Sized,
    {
        if self.accurate_duration.is_some() {
            return Ok(self);
        }
        let detail = match &self.detail {
            Some(detail) => Arc::clone(detail),
            None => {
                let detail = source.detail(&self.log_ref()).await?;
                self.detail = Some(Arc::clone(&detail));
                detail
            }
        };
        self.accurate_duration = Some(detail.duration()?);
        Ok(self)
    }
}

/// `https://dps.report/AbCd-20210101-203040_xera` becomes `AbCd-20210101-203040`.
fn id_from_permalink(permalink: &str) -> String {
    let tail = permalink.strip_prefix(PERMALINK_HOST).unwrap_or(permalink);
    match tail.rfind('_') {
        Some(idx) => tail[..idx].to_owned(),
        None => tail.to_owned(),
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
