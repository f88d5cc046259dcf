#![forbid(unsafe_code)]

use crate::{
    error::Error,
    log_time::LogTime,
    record::{LogRecord, LogRef},
    source::LogSource,
};
use chrono::{DateTime, Utc};
use sqlx::{
    Row, Sqlite, SqlitePool,
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One persisted encounter. Rows loaded from a link file hold only the
/// permalink until healed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEncounter {
    pub permalink: String,
    pub date: Option<DateTime<Utc>>,
    pub boss: Option<String>,
    pub time: Option<LogTime>,
    pub success: Option<bool>,
    pub cm: Option<bool>,
}

impl StoredEncounter {
    fn from_row(row: &SqliteRow) -> Result<Self, Error> {
        let date: Option<i64> = row.try_get("date")?;
        let time: Option<i64> = row.try_get("time")?;
        Ok(Self {
            permalink: row.try_get("log")?,
            date: date.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            boss: row.try_get("boss")?,
            time: time.map(LogTime::from_ms),
            success: row.try_get("success")?,
            cm: row.try_get("cm")?,
        })
    }

    /// Whether every metadata column is filled.
    pub fn is_complete(&self) -> bool {
        self.date.is_some()
            && self.boss.is_some()
            && self.time.is_some()
            && self.success.is_some()
            && self.cm.is_some()
    }
}

/// Fastest successful kill within a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestTime {
    pub permalink: String,
    pub time: LogTime,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub inserted: usize,
    pub duplicates: usize,
    /// Logs whose duration could not be resolved, keyed by permalink.
    pub failed: Vec<(String, Error)>,
    /// Every input log, imported ones with their accurate durations cached,
    /// ready for classification and display without refetching.
    pub logs: Vec<LogRecord>,
}

#[derive(Debug, Default)]
pub struct HealReport {
    pub updated: usize,
    pub failed: Vec<(String, Error)>,
}

/// Durable history of imported encounters.
///
/// Writes go through a single connection and every row commits on its own,
/// so an interrupted batch keeps what it already wrote.
#[derive(Debug, Clone)]
pub struct EncounterStore {
    path: PathBuf,
    pool: SqlitePool,
}

const COLUMNS: &str = "log, date, boss, time, success, cm";

impl EncounterStore {
    /// Open the database at `path`, creating it and its schema if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        debug!(path = %path.display(), "encounter store opened");
        Ok(Self { path, pool })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn contains(&self, permalink: &str) -> Result<bool, Error> {
        let row = sqlx::query("SELECT 1 FROM encounters WHERE log = ?")
            .bind(permalink)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn get(&self, permalink: &str) -> Result<Option<StoredEncounter>, Error> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM encounters WHERE log = ?"))
            .bind(permalink)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(StoredEncounter::from_row).transpose()
    }

    pub async fn count(&self) -> Result<u64, Error> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM encounters")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count.max(0) as u64)
    }

    /// Insert a fully populated row per log. Logs already stored are
    /// skipped; durations are resolved through `source` only when the log
    /// does not carry one yet.
    pub async fn import_logs<S>(&self, logs: Vec<LogRecord>, source: &S) -> Result<ImportReport, Error>
    where
        S: LogSource + ?Sized,
    {
        let mut report = ImportReport::default();

        for log in logs {
            if self.contains(&log.permalink).await? {
                info!(permalink = %log.permalink, "already in store");
                report.duplicates += 1;
                report.logs.push(log);
                continue;
            }

            let permalink = log.permalink.clone();
            let log = match log.clone().resolve_duration(source).await {
                Ok(log) => log,
                Err(err) => {
                    warn!(%permalink, %err, "could not resolve duration, not imported");
                    report.failed.push((permalink, err));
                    report.logs.push(log);
                    continue;
                }
            };

            let mut tx = self.pool.begin().await?;
            let query = sqlx::query(
                "INSERT INTO encounters (date, boss, time, success, cm, log) \
                 VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(log) DO NOTHING",
            );
            let rows_affected = bind_row(query, &log).execute(&mut *tx).await?.rows_affected();
            tx.commit().await?;

            if rows_affected == 0 {
                info!(%permalink, "already in store");
                report.duplicates += 1;
            } else {
                debug!(%permalink, "imported");
                report.inserted += 1;
            }
            report.logs.push(log);
        }

        Ok(report)
    }

    /// Insert a permalink-only row per non-empty line of `path`, to be
    /// filled in later by [`update_fields`](Self::update_fields).
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<ImportReport, Error> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let mut report = ImportReport::default();

        for permalink in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut tx = self.pool.begin().await?;
            let rows_affected = sqlx::query("INSERT INTO encounters (log) VALUES (?) ON CONFLICT(log) DO NOTHING")
                .bind(permalink)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tx.commit().await?;

            if rows_affected == 0 {
                info!(%permalink, "already in store");
                report.duplicates += 1;
            } else {
                report.inserted += 1;
            }
        }

        Ok(report)
    }

    /// Rows missing at least one metadata column.
    pub async fn incomplete(&self) -> Result<Vec<StoredEncounter>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM encounters WHERE date IS NULL OR boss IS NULL \
             OR time IS NULL OR success IS NULL OR cm IS NULL"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(StoredEncounter::from_row).collect()
    }

    /// Refetch every incomplete row through `source` and rewrite it whole.
    pub async fn update_fields<S>(&self, source: &S) -> Result<HealReport, Error>
    where
        S: LogSource + ?Sized,
    {
        let mut report = HealReport::default();
        let refs = self
            .incomplete()
            .await?
            .into_iter()
            .map(|row| LogRef::Permalink(row.permalink))
            .collect::<Vec<_>>();
        if refs.is_empty() {
            return Ok(report);
        }
        info!(count = refs.len(), "healing incomplete rows");

        let batch = source.metadata(refs).await;
        report
            .failed
            .extend(batch.failed.into_iter().map(|(log, err)| (log.as_str().to_owned(), err)));

        for log in batch.done {
            let permalink = log.permalink.clone();
            let log = match log.resolve_duration(source).await {
                Ok(log) => log,
                Err(err) => {
                    warn!(%permalink, %err, "could not resolve duration");
                    report.failed.push((permalink, err));
                    continue;
                }
            };

            let mut tx = self.pool.begin().await?;
            let query = sqlx::query(
                "UPDATE encounters SET date = ?, boss = ?, time = ?, success = ?, cm = ? WHERE log = ?",
            );
            let rows_affected = bind_row(query, &log).execute(&mut *tx).await?.rows_affected();
            tx.commit().await?;

            if rows_affected == 0 {
                warn!(%permalink, "service answered with a permalink not in store");
            } else {
                report.updated += 1;
            }
        }

        Ok(report)
    }

    /// Date of the oldest row, `None` when nothing is dated yet.
    pub async fn earliest_date(&self) -> Result<Option<DateTime<Utc>>, Error> {
        let secs: Option<i64> = sqlx::query("SELECT MIN(date) FROM encounters")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(secs.and_then(|secs| DateTime::from_timestamp(secs, 0)))
    }

    /// Fastest successful kill of `boss` with the given challenge-mode flag,
    /// dated within `[start, end]`. The range defaults to the oldest row
    /// through now.
    pub async fn best_time(
        &self,
        boss: &str,
        is_cm: bool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<BestTime>, Error> {
        let start = match start {
            Some(start) => start,
            None => match self.earliest_date().await? {
                Some(earliest) => earliest,
                None => return Ok(None),
            },
        };
        let end = end.unwrap_or_else(Utc::now);

        let row = sqlx::query(
            "SELECT log, time FROM encounters \
             WHERE (date BETWEEN ? AND ?) AND boss = ? AND cm = ? AND success = 1 \
             AND time IS NOT NULL \
             ORDER BY time ASC LIMIT 1",
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .bind(boss)
        .bind(is_cm)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let time: i64 = row.try_get("time")?;
        Ok(Some(BestTime {
            permalink: row.try_get("log")?,
            time: LogTime::from_ms(time),
        }))
    }

    /// `candidate` minus the best time in range. Without any recorded kill
    /// the baseline is zero, so the result is never negative.
    pub async fn compare_time(
        &self,
        candidate: LogTime,
        boss: &str,
        is_cm: bool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<LogTime, Error> {
        Ok(match self.best_time(boss, is_cm, start, end).await? {
            Some(best) => candidate - best.time,
            None => LogTime::ZERO,
        })
    }

    /// Rows dated within `[start, end)`, oldest first.
    pub async fn rows_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<StoredEncounter>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM encounters WHERE date >= ? AND date < ? ORDER BY date ASC"
        ))
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(StoredEncounter::from_row).collect()
    }
}

/// Binds date, boss, time, success, cm and permalink, in that order.
fn bind_row<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    log: &'q LogRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(log.encounter_time.timestamp())
        .bind(log.encounter.boss.as_str())
        .bind(log.accurate_duration().map(|time| time.as_ms()))
        .bind(log.encounter.success)
        .bind(log.encounter.is_cm)
        .bind(log.permalink.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{detail::Detail, record::Encounter, source::Batch};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tempfile::TempDir;

    /// Source that must never be asked anything.
    struct Offline;

    #[async_trait]
    impl LogSource for Offline {
        async fn detail(&self, log: &LogRef) -> Result<Arc<Detail>, Error> {
            panic!("unexpected detail fetch for {log}")
        }

        async fn metadata(&self, logs: Vec<LogRef>) -> Batch<LogRecord> {
            panic!("unexpected metadata fetch for {logs:?}")
        }
    }

    /// Source answering every detail request with the same duration.
    #[derive(Default)]
    struct FixedDuration {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LogSource for FixedDuration {
        async fn detail(&self, _log: &LogRef) -> Result<Arc<Detail>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Detail::from_value(
                serde_json::json!({ "duration": "02m 05s 000ms" }),
            )))
        }

        async fn metadata(&self, _logs: Vec<LogRef>) -> Batch<LogRecord> {
            Batch::default()
        }
    }

    async fn store() -> (TempDir, EncounterStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EncounterStore::open(dir.path().join("nested/encounters.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn kill(permalink: &str, boss: &str, secs: i64, ms: Option<i64>) -> LogRecord {
        LogRecord::restored(
            permalink,
            DateTime::from_timestamp(secs, 0).unwrap(),
            Encounter {
                boss: boss.into(),
                success: true,
                ..Default::default()
            },
            ms.map(LogTime::from_ms),
        )
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let (dir, store) = store().await;
        assert!(dir.path().join("nested/encounters.db").exists());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_resolves_duration_once() {
        let (_dir, store) = store().await;
        let source = FixedDuration::default();

        let report = store
            .import_logs(vec![kill("https://dps.report/a_xera", "Xera", 100, None)], &source)
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.logs[0].accurate_duration(), Some(LogTime::from_ms(125_000)));

        let row = store.get("https://dps.report/a_xera").await.unwrap().unwrap();
        assert_eq!(row.time, Some(LogTime::from_ms(125_000)));
        assert_eq!(row.boss.as_deref(), Some("Xera"));
        assert_eq!(row.success, Some(true));
        assert_eq!(row.cm, Some(false));
        assert!(row.is_complete());
    }

    #[tokio::test]
    async fn import_skips_stored_permalinks() {
        let (_dir, store) = store().await;
        let log = kill("https://dps.report/a_xera", "Xera", 100, Some(1_000));

        store.import_logs(vec![log.clone()], &Offline).await.unwrap();
        let report = store.import_logs(vec![log], &Offline).await.unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn load_from_file_inserts_bare_rows() {
        let (dir, store) = store().await;
        let file = dir.path().join("links.txt");
        std::fs::write(&file, "https://dps.report/a_xera\n\n  https://dps.report/b_kc  \nhttps://dps.report/a_xera\n").unwrap();

        let report = store.load_from_file(&file).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates, 1);

        let row = store.get("https://dps.report/b_kc").await.unwrap().unwrap();
        assert!(!row.is_complete());
        assert_eq!(store.incomplete().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn best_time_respects_filters_and_range() {
        let (_dir, store) = store().await;
        let mut failed = kill("https://dps.report/f_xera", "Xera", 150, Some(10_000));
        failed.encounter.success = false;
        let mut cm = kill("https://dps.report/c_xera", "Xera", 150, Some(20_000));
        cm.encounter.is_cm = true;
        let logs = vec![
            kill("https://dps.report/a_xera", "Xera", 100, Some(130_000)),
            kill("https://dps.report/b_xera", "Xera", 200, Some(125_000)),
            kill("https://dps.report/k_kc", "Keep Construct", 200, Some(5_000)),
            failed,
            cm,
        ];
        store.import_logs(logs, &Offline).await.unwrap();

        let best = store.best_time("Xera", false, None, None).await.unwrap().unwrap();
        assert_eq!(best.permalink, "https://dps.report/b_xera");
        assert_eq!(best.time.to_string(), "2:05.000");

        let early = DateTime::from_timestamp(150, 0);
        let best = store.best_time("Xera", false, None, early).await.unwrap().unwrap();
        assert_eq!(best.permalink, "https://dps.report/a_xera");

        let best = store.best_time("Xera", true, None, None).await.unwrap().unwrap();
        assert_eq!(best.time, LogTime::from_ms(20_000));

        assert_eq!(store.earliest_date().await.unwrap(), DateTime::from_timestamp(100, 0));
    }

    #[tokio::test]
    async fn compare_time_against_history() {
        let (_dir, store) = store().await;
        let candidate = LogTime::from_ms(120_000);

        let delta = store.compare_time(candidate, "Xera", false, None, None).await.unwrap();
        assert_eq!(delta, LogTime::ZERO);
        assert!(store.earliest_date().await.unwrap().is_none());

        store
            .import_logs(vec![kill("https://dps.report/a_xera", "Xera", 100, Some(125_000))], &Offline)
            .await
            .unwrap();
        let delta = store.compare_time(candidate, "Xera", false, None, None).await.unwrap();
        assert!(delta.is_negative());
        assert_eq!(delta.to_string(), "-0:05.000");
    }
}
