#![forbid(unsafe_code)]

mod api;
mod report_client;

pub use api::{HttpReportApi, Reply, ReportApi};
pub use report_client::{ReportClient, accepted_logs};
