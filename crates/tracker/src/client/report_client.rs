#![forbid(unsafe_code)]

use super::api::{HttpReportApi, Reply, ReportApi};
use crate::{
    detail::Detail,
    error::Error,
    record::{LogRecord, LogRef},
    source::{Batch, LogSource},
};
use async_trait::async_trait;
use config::Service;
use serde::Deserialize;
use std::{future::Future, path::PathBuf, sync::Arc, time::Instant};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, trace, warn};

/// Client for the remote log analysis service.
///
/// Every batch operation fans out over at most `workers` concurrent requests.
/// Results come back in completion order, not submission order.
#[derive(Debug)]
pub struct ReportClient<A = HttpReportApi> {
    api: Arc<A>,
    workers: usize,
    attempts: u32,
}

impl ReportClient<HttpReportApi> {
    pub fn from_config(service: &Service) -> Result<Self, Error> {
        let api = HttpReportApi::new(service)?;
        Ok(Self::new(api, service.workers(), service.attempts()))
    }
}

impl<A> Clone for ReportClient<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            workers: self.workers,
            attempts: self.attempts,
        }
    }
}

impl<A: ReportApi> ReportClient<A> {
    pub fn new(api: A, workers: usize, attempts: u32) -> Self {
        Self {
            api: Arc::new(api),
            workers: workers.max(1),
            attempts: attempts.max(1),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run `op` for every item with at most `workers` of them in flight.
    async fn fan_out<I, T, F, Fut>(&self, items: Vec<I>, op: F) -> Vec<(I, Result<T, Error>)>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(Arc<A>, I) -> Fut,
        Fut: Future<Output = (I, Result<T, Error>)> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut js = JoinSet::new();

        for item in items {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    warn!(%err, "worker semaphore closed");
                    break;
                }
            };
            let task = op(Arc::clone(&self.api), item);
            js.spawn(async move {
                let _permit = permit;
                task.await
            });
        }

        let mut results = Vec::new();
        while let Some(res) = js.join_next().await {
            match res {
                Ok(result) => results.push(result),
                Err(err) => warn!(%err, "request task join failed"),
            }
        }
        results
    }

    /// Upload every file, pairing each path with its parsed record.
    ///
    /// A file the service refuses (typically a log too short to analyze) or
    /// that fails in transport pairs with `None`; the others are unaffected.
    pub async fn upload_logs(&self, paths: Vec<PathBuf>) -> Vec<(PathBuf, Option<LogRecord>)> {
        let started = Instant::now();
        for path in &paths {
            debug!(path = %path.display(), "queued for upload");
        }

        let results = self
            .fan_out(paths, |api, path: PathBuf| async move {
                let reply = api.upload(&path).await;
                (path, reply)
            })
            .await;

        let mut uploaded = Vec::with_capacity(results.len());
        for (path, reply) in results {
            let record = match reply.and_then(Reply::success) {
                Ok(reply) => match LogRecord::from_metadata(&reply.body) {
                    Ok(record) => {
                        info!(path = %path.display(), permalink = %record.permalink, "uploaded");
                        Some(record)
                    }
                    Err(err) => {
                        warn!(path = %path.display(), %err, "upload answer did not parse");
                        None
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), %err, "upload refused");
                    None
                }
            };
            uploaded.push((path, record));
        }

        info!(elapsed = ?started.elapsed(), count = uploaded.len(), "uploads finished");
        uploaded
    }

    /// Metadata of one log. A body that fails to parse is fetched again, up
    /// to the configured attempts; an HTTP failure is final.
    pub async fn get_upload_metadata(&self, log: &LogRef) -> Result<LogRecord, Error> {
        let mut attempt = 1;
        loop {
            let reply = self.api.metadata(log).await?.success()?;
            match serde_json::from_slice::<LogRecord>(&reply.body) {
                Ok(mut record) => {
                    record.fill_id();
                    return Ok(record);
                }
                Err(source) if attempt >= self.attempts => {
                    return Err(Error::Malformed {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    debug!(%log, %err, attempt, "malformed metadata, fetching again");
                    attempt += 1;
                }
            }
        }
    }

    /// Metadata of many logs.
    ///
    /// Identifiers whose body fails to parse go into the next round; after
    /// the last round they are reported as [`Error::Malformed`]. HTTP
    /// failures are reported right away.
    pub async fn get_upload_metadatas(&self, logs: Vec<LogRef>) -> Batch<LogRecord> {
        let mut batch = Batch::default();
        let mut pending = logs;
        let mut round = 1;

        while !pending.is_empty() {
            trace!(round, count = pending.len(), "fetching metadata");
            let results = self
                .fan_out(pending, |api, log: LogRef| async move {
                    let reply = api.metadata(&log).await;
                    (log, reply)
                })
                .await;

            let mut requeue = Vec::new();
            for (log, reply) in results {
                let reply = match reply.and_then(Reply::success) {
                    Ok(reply) => reply,
                    Err(err) => {
                        warn!(%log, %err, "metadata request failed");
                        batch.failed.push((log, err));
                        continue;
                    }
                };
                match serde_json::from_slice::<LogRecord>(&reply.body) {
                    Ok(mut record) => {
                        record.fill_id();
                        batch.done.push(record);
                    }
                    Err(source) if round >= self.attempts => {
                        warn!(%log, %source, "metadata stayed malformed");
                        batch.failed.push((
                            log,
                            Error::Malformed {
                                attempts: round,
                                source,
                            },
                        ));
                    }
                    Err(err) => {
                        debug!(%log, %err, "malformed metadata, requeued");
                        requeue.push(log);
                    }
                }
            }

            pending = requeue;
            round += 1;
        }

        batch
    }

    /// Detail payload of one log. A body that fails to parse is fetched
    /// again, up to the configured attempts; an HTTP failure is final.
    pub async fn get_json(&self, log: &LogRef) -> Result<Arc<Detail>, Error> {
        let mut attempt = 1;
        loop {
            let reply = self.api.detail(log).await?.success()?;
            match serde_json::from_slice(&reply.body) {
                Ok(value) => return Ok(Arc::new(Detail::from_value(value))),
                Err(source) if attempt >= self.attempts => {
                    return Err(Error::Malformed {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    debug!(%log, %err, attempt, "malformed detail, fetching again");
                    attempt += 1;
                }
            }
        }
    }

    /// Attach detail payloads to every record lacking one. Records that
    /// already carry a payload are returned as-is without a request.
    ///
    /// Malformed bodies are requeued round by round like
    /// [`get_upload_metadatas`](Self::get_upload_metadatas).
    pub async fn get_jsons(&self, logs: Vec<LogRecord>) -> Batch<LogRecord, LogRecord> {
        let started = Instant::now();
        let mut batch = Batch::default();
        let (cached, mut pending): (Vec<_>, Vec<_>) =
            logs.into_iter().partition(|log| log.detail().is_some());
        batch.done.extend(cached);
        let mut round = 1;

        while !pending.is_empty() {
            trace!(round, count = pending.len(), "fetching details");
            let results = self
                .fan_out(pending, |api, log: LogRecord| async move {
                    let reply = api.detail(&log.log_ref()).await;
                    (log, reply)
                })
                .await;

            let mut requeue = Vec::new();
            for (log, reply) in results {
                let reply = match reply.and_then(Reply::success) {
                    Ok(reply) => reply,
                    Err(err) => {
                        warn!(permalink = %log.permalink, %err, "detail request failed");
                        batch.failed.push((log, err));
                        continue;
                    }
                };
                match serde_json::from_slice(&reply.body) {
                    Ok(value) => batch
                        .done
                        .push(log.with_detail(Arc::new(Detail::from_value(value)))),
                    Err(source) if round >= self.attempts => {
                        warn!(permalink = %log.permalink, %source, "detail stayed malformed");
                        batch.failed.push((
                            log,
                            Error::Malformed {
                                attempts: round,
                                source,
                            },
                        ));
                    }
                    Err(err) => {
                        debug!(permalink = %log.permalink, %err, "malformed detail, requeued");
                        requeue.push(log);
                    }
                }
            }

            pending = requeue;
            round += 1;
        }

        debug!(elapsed = ?started.elapsed(), "detail payloads fetched");
        batch
    }

    /// One page of the uploads tied to the token.
    pub async fn get_uploads(&self, page: u32) -> Result<Vec<LogRecord>, Error> {
        #[derive(Deserialize)]
        struct Page {
            #[serde(default)]
            uploads: Vec<LogRecord>,
        }

        let reply = self.api.uploads(page).await?.success()?;
        let mut page: Page = serde_json::from_slice(&reply.body)?;
        page.uploads.iter_mut().for_each(LogRecord::fill_id);
        Ok(page.uploads)
    }

    /// Request a fresh user token and use it for later calls.
    pub async fn get_user_token(&self) -> Result<String, Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Token {
            user_token: String,
        }

        let reply = self.api.user_token().await?.success()?;
        let token = match serde_json::from_slice::<Token>(&reply.body) {
            Ok(token) => token.user_token,
            Err(_) => String::from_utf8_lossy(&reply.body).trim().to_owned(),
        };
        if token.is_empty() {
            return Err(Error::MissingField("userToken"));
        }
        self.api.set_token(&token);
        Ok(token)
    }
}

/// Records that uploaded, logging every path that did not.
pub fn accepted_logs(uploads: Vec<(PathBuf, Option<LogRecord>)>) -> Vec<LogRecord> {
    uploads
        .into_iter()
        .filter_map(|(path, record)| {
            if record.is_none() {
                info!(path = %path.display(), "skipped because it was too short");
            }
            record
        })
        .collect()
}

#[async_trait]
impl<A: ReportApi> LogSource for ReportClient<A> {
    async fn detail(&self, log: &LogRef) -> Result<Arc<Detail>, Error> {
        self.get_json(log).await
    }

    async fn metadata(&self, logs: Vec<LogRef>) -> Batch<LogRecord> {
        self.get_upload_metadatas(logs).await
    }
}
