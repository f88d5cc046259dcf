#![forbid(unsafe_code)]

mod replay;
mod repo;

pub(crate) use replay::local_midnight;
pub use repo::{BestTime, EncounterStore, HealReport, ImportReport, StoredEncounter};
