#![forbid(unsafe_code)]

pub mod catalog;
pub mod client;
pub mod detail;
mod error;
pub mod log_time;
pub mod record;
pub mod session;
pub mod sink;
pub mod source;
pub mod store;

pub use catalog::{EncounterCatalog, EncounterDefinition, StaticCatalog};
pub use client::{HttpReportApi, Reply, ReportApi, ReportClient, accepted_logs};
pub use detail::Detail;
pub use error::Error;
pub use log_time::LogTime;
pub use record::{LogRecord, LogRef};
pub use session::{EncounterBucket, EncounterGroup, SessionSet};
pub use sink::{SessionSink, TracingSink};
pub use source::{Batch, LogSource};
pub use store::{BestTime, EncounterStore, HealReport, ImportReport, StoredEncounter};
