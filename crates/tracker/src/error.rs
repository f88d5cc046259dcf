#![forbid(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] config::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("service answered with status {0}")]
    Status(u16),

    #[error("service still answered {status} after {retries} retries")]
    RetriesExhausted { status: u16, retries: u32 },

    #[error("response stayed malformed after {attempts} attempts: {source}")]
    Malformed {
        attempts: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown encounter: {0}")]
    UnknownEncounter(String),

    #[error("target id {0} does not match any known encounter")]
    UnknownTarget(u32),

    #[error("folder {0} does not match any known encounter")]
    UnknownFolder(String),

    #[error("boss name {0} does not match any known encounter")]
    UnknownBoss(String),

    #[error("target id {id} is claimed by both {first} and {second}")]
    DuplicateTarget {
        id: u32,
        first: String,
        second: String,
    },

    #[error("encounter key {0} is defined twice")]
    DuplicateKey(String),

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("detail payload is missing `{0}`")]
    MissingField(&'static str),
}

impl Error {
    /// Lookups against the encounter catalog that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownEncounter(_)
                | Self::UnknownTarget(_)
                | Self::UnknownFolder(_)
                | Self::UnknownBoss(_)
        )
    }
}
