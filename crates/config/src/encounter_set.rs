#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// One named group of encounters, e.g. a raid wing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    /// Short keys, in display order.
    pub encounters: Vec<String>,
}

impl GroupSpec {
    pub fn new<I, S>(name: impl Into<String>, encounters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            encounters: encounters.into_iter().map(Into::into).collect(),
        }
    }
}
