#![forbid(unsafe_code)]

use crate::retry_policy::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Service {
    /// Root of the remote analysis service. Endpoints are joined onto it.
    pub base_url: String,

    /// Opaque token attached to authenticated calls as a query parameter.
    pub user_token: Option<String>,

    /// Upper bound on concurrent requests. The service rate-limits hard.
    pub max_workers: usize,

    /// Attempts per identifier when the response body fails to parse.
    pub parse_attempts: u32,

    /// Per-request timeout in seconds. Uploads of large logs are slow.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub request_timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: "https://dps.report/".into(),
            user_token: None,
            max_workers: 4,
            parse_attempts: 3,
            request_timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

impl Service {
    pub fn workers(&self) -> usize {
        self.max_workers.max(1)
    }

    pub fn attempts(&self) -> u32 {
        self.parse_attempts.max(1)
    }
}
