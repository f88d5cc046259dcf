use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid log folder pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("No encounter set named and none configured")]
    NoEncounterSet,

    #[error("No log folder configured")]
    NoLogFolder,

    #[error("No encounter store configured")]
    NoStore,

    #[error("Saving the token needs a configuration file")]
    NoConffile,
}
