#![forbid(unsafe_code)]

use crate::{
    detail::Detail,
    error::Error,
    record::{LogRecord, LogRef},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a batch request: everything that worked, plus each element
/// that did not together with why.
#[derive(Debug)]
pub struct Batch<T, K = LogRef> {
    pub done: Vec<T>,
    pub failed: Vec<(K, Error)>,
}

impl<T, K> Default for Batch<T, K> {
    fn default() -> Self {
        Self {
            done: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T, K> Batch<T, K> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Where the store and records fetch what they do not hold yet.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Detail payload of one log.
    async fn detail(&self, log: &LogRef) -> Result<Arc<Detail>, Error>;

    /// Metadata of many logs.
    async fn metadata(&self, logs: Vec<LogRef>) -> Batch<LogRecord>;
}
