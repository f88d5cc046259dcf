#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    path::Path,
};
use tracker::{Error, LogRef, Reply, ReportApi, ReportClient};

/// In-memory service answering from scripted replies.
///
/// Each key holds a queue; the last reply repeats once the queue drains.
#[derive(Debug, Default)]
pub struct FakeApi {
    uploads: Mutex<HashMap<String, VecDeque<Reply>>>,
    metadata: Mutex<HashMap<String, VecDeque<Reply>>>,
    details: Mutex<HashMap<String, VecDeque<Reply>>>,
    pages: Mutex<HashMap<u32, VecDeque<Reply>>>,
    token_reply: Mutex<Option<Reply>>,
    token: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

fn next<K: std::hash::Hash + Eq>(queues: &Mutex<HashMap<K, VecDeque<Reply>>>, key: &K) -> Reply {
    let mut queues = queues.lock();
    match queues.get_mut(key) {
        Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
        Some(queue) => queue.front().cloned().unwrap_or_else(|| Reply::new(404, "")),
        None => Reply::new(404, ""),
    }
}

impl FakeApi {
    /// Answer uploads of files named `file_name`.
    pub fn on_upload(self, file_name: &str, reply: Reply) -> Self {
        self.uploads.lock().entry(file_name.into()).or_default().push_back(reply);
        self
    }

    pub fn on_metadata(self, log: &str, reply: Reply) -> Self {
        self.metadata.lock().entry(log.into()).or_default().push_back(reply);
        self
    }

    pub fn on_detail(self, log: &str, reply: Reply) -> Self {
        self.details.lock().entry(log.into()).or_default().push_back(reply);
        self
    }

    pub fn on_page(self, page: u32, reply: Reply) -> Self {
        self.pages.lock().entry(page).or_default().push_back(reply);
        self
    }

    pub fn on_token(self, reply: Reply) -> Self {
        *self.token_reply.lock() = Some(reply);
        self
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// Number of calls made to `endpoint` for `key`.
    pub fn calls(&self, endpoint: &str, key: &str) -> usize {
        let needle = format!("{endpoint} {key}");
        self.calls.lock().iter().filter(|c| **c == needle).count()
    }

    pub fn total_calls(&self, endpoint: &str) -> usize {
        let prefix = format!("{endpoint} ");
        self.calls.lock().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    fn record(&self, endpoint: &str, key: &str) {
        self.calls.lock().push(format!("{endpoint} {key}"));
    }

    pub fn client(self) -> ReportClient<Self> {
        ReportClient::new(self, 4, 3)
    }
}

#[async_trait]
impl ReportApi for FakeApi {
    async fn upload(&self, path: &Path) -> Result<Reply, Error> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // the real client reads the file too
        tokio::fs::read(path).await?;
        self.record("upload", &name);
        Ok(next(&self.uploads, &name))
    }

    async fn metadata(&self, log: &LogRef) -> Result<Reply, Error> {
        self.record("metadata", log.as_str());
        Ok(next(&self.metadata, &log.as_str().to_owned()))
    }

    async fn detail(&self, log: &LogRef) -> Result<Reply, Error> {
        self.record("detail", log.as_str());
        Ok(next(&self.details, &log.as_str().to_owned()))
    }

    async fn uploads(&self, page: u32) -> Result<Reply, Error> {
        self.record("uploads", &page.to_string());
        Ok(next(&self.pages, &page))
    }

    async fn user_token(&self) -> Result<Reply, Error> {
        self.record("token", "");
        Ok(self.token_reply.lock().clone().unwrap_or_else(|| Reply::new(500, "")))
    }

    fn set_token(&self, token: &str) {
        *self.token.lock() = Some(token.to_owned());
    }
}

pub fn permalink(id: &str, key: &str) -> String {
    format!("https://dps.report/{id}_{key}")
}

/// Metadata document as the service sends it.
pub fn metadata(id: &str, boss_id: u32, boss: &str, success: bool, encounter_time: i64) -> String {
    serde_json::json!({
        "id": id,
        "permalink": permalink(id, "boss"),
        "uploadTime": encounter_time + 60,
        "encounterTime": encounter_time,
        "generator": "Elite Insights",
        "generatorId": 1,
        "generatorVersion": 2,
        "language": "en",
        "languageId": 0,
        "evtc": { "type": "EVTC", "version": "EVTC20231010", "bossId": boss_id },
        "players": {},
        "encounter": {
            "uniqueId": null,
            "success": success,
            "duration": 125,
            "compDps": 48000,
            "numberOfPlayers": 10,
            "numberOfGroups": 2,
            "bossId": boss_id,
            "boss": boss,
            "isCm": false,
            "gw2Build": 150000,
            "jsonAvailable": true
        }
    })
    .to_string()
}

pub fn detail(duration: &str) -> String {
    serde_json::json!({
        "duration": duration,
        "timeStartStd": "2023-11-14 22:13:20 +00:00",
        "timeEndStd": "2023-11-14 22:15:25 +00:00",
        "targets": [],
        "players": []
    })
    .to_string()
}

pub fn ok(body: impl Into<String>) -> Reply {
    Reply::new(200, body.into())
}
