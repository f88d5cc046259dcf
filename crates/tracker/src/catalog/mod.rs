#![forbid(unsafe_code)]

mod static_catalog;
mod table;

pub use static_catalog::StaticCatalog;

use crate::error::Error;
use std::fmt;

/// One logical encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterDefinition {
    /// Stable abbreviation, e.g. `xera`.
    pub key: String,
    /// Display name.
    pub name: String,
    pub folders: Vec<String>,
    /// Ordered target ids. Never empty.
    pub ids: Vec<u32>,
}

impl EncounterDefinition {
    pub fn new<F, S>(
        key: impl Into<String>,
        name: impl Into<String>,
        folders: F,
        ids: impl Into<Vec<u32>>,
    ) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            name: name.into(),
            folders: folders.into_iter().map(Into::into).collect(),
            ids: ids.into(),
        }
    }
}

/// Lookups between folder names, target ids, short keys and display names.
///
/// All lookups fail loudly with a not-found error instead of defaulting:
/// misclassifying a log is worse than refusing it.
pub trait EncounterCatalog: fmt::Debug + Send + Sync {
    fn resolve_by_folder(&self, folder: &str) -> Result<&str, Error>;

    fn resolve_by_id(&self, id: u32) -> Result<&str, Error>;

    fn ids_for_key(&self, key: &str) -> Result<&[u32], Error>;

    fn name_for_key(&self, key: &str) -> Result<&str, Error>;

    /// Maps a boss name as persisted by the store (the service's display
    /// name) back to a short key.
    fn resolve_by_name(&self, name: &str) -> Result<&str, Error>;
}
