#![forbid(unsafe_code)]

use crate::{error::Error, record::LogRef};
use async_trait::async_trait;
use bytes::Bytes;
use config::{RetryPolicy, Service};
use parking_lot::RwLock;
use reqwest::{
    RequestBuilder,
    multipart::{Form, Part},
};
use std::path::Path;
use tracing::{debug, trace};

/// Raw answer of the service: status plus undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Bytes,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx reply into [`Error::Status`].
    pub fn success(self) -> Result<Self, Error> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Status(self.status))
        }
    }
}

/// Endpoints of the remote log analysis service.
///
/// Implementations handle transport concerns (authentication, transient
/// retries); decoding and application-level retries live in
/// [`ReportClient`](super::ReportClient).
#[async_trait]
pub trait ReportApi: Send + Sync + 'static {
    /// Upload one log file as multipart form data.
    async fn upload(&self, path: &Path) -> Result<Reply, Error>;

    async fn metadata(&self, log: &LogRef) -> Result<Reply, Error>;

    async fn detail(&self, log: &LogRef) -> Result<Reply, Error>;

    /// One page of the uploads tied to the current token.
    async fn uploads(&self, page: u32) -> Result<Reply, Error>;

    /// Ask for a user token. Without a cookie the service mints a new one on
    /// every call.
    async fn user_token(&self) -> Result<Reply, Error>;

    /// Use `token` on subsequent authenticated calls.
    fn set_token(&self, _token: &str) {}
}

#[derive(Debug)]
pub struct HttpReportApi {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    retry: RetryPolicy,
}

impl HttpReportApi {
    pub fn new(service: &Service) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(service.request_timeout)
            .build()?;
        let base_url = format!("{}/", service.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(service.user_token.clone()),
            retry: service.retry.clone(),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Send the request built by `build`, rebuilding and resending it while
    /// the answer is a transient status or a connection failure, up to the
    /// retry budget.
    async fn send<F>(&self, build: F) -> Result<Reply, Error>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut retries = 0;
        loop {
            match build().send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !self.retry.is_transient(status) {
                        let body = response.bytes().await?;
                        trace!(status, len = body.len(), "response received");
                        return Ok(Reply { status, body });
                    }
                    if retries >= self.retry.total {
                        return Err(Error::RetriesExhausted { status, retries });
                    }
                    debug!(status, retries, "transient status, retrying");
                }
                Err(err) if retries < self.retry.total && (err.is_connect() || err.is_timeout()) => {
                    debug!(%err, retries, "transport failure, retrying");
                }
                Err(err) => return Err(err.into()),
            }
            retries += 1;
            tokio::time::sleep(self.retry.backoff(retries)).await;
        }
    }
}

#[async_trait]
impl ReportApi for HttpReportApi {
    async fn upload(&self, path: &Path) -> Result<Reply, Error> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zevtc".to_owned());
        // the file handle is dropped once read; retries resend from memory
        let content = Bytes::from(tokio::fs::read(path).await?);

        // always ask for a JSON body
        let mut params = vec![("json", "1".to_owned())];
        if let Some(token) = self.token() {
            params.push(("userToken", token));
        }

        let url = self.url("uploadContent");
        self.send(|| {
            let part = Part::stream_with_length(content.clone(), content.len() as u64)
                .file_name(file_name.clone());
            self.http
                .post(&url)
                .query(&params)
                .multipart(Form::new().part("file", part))
        })
        .await
    }

    async fn metadata(&self, log: &LogRef) -> Result<Reply, Error> {
        let url = self.url("getUploadMetadata");
        let param = [log.query()];
        self.send(|| self.http.get(&url).query(&param)).await
    }

    async fn detail(&self, log: &LogRef) -> Result<Reply, Error> {
        let url = self.url("getJson");
        let param = [log.query()];
        self.send(|| self.http.get(&url).query(&param)).await
    }

    async fn uploads(&self, page: u32) -> Result<Reply, Error> {
        let url = self.url("getUploads");
        let mut params = vec![("page", page.to_string())];
        if let Some(token) = self.token() {
            params.push(("userToken", token));
        }
        self.send(|| self.http.get(&url).query(&params)).await
    }

    async fn user_token(&self) -> Result<Reply, Error> {
        let url = self.url("getUserToken");
        self.send(|| self.http.get(&url)).await
    }

    fn set_token(&self, token: &str) {
        *self.token.write() = Some(token.to_owned());
    }
}
