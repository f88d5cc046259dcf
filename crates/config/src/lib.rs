#![forbid(unsafe_code)]

mod encounter_set;
mod error;
mod retry_policy;
mod service;
mod session;
mod store;

pub use encounter_set::GroupSpec;
pub use error::Error;
pub use retry_policy::{BACKOFF_MAX, RetryPolicy};
pub use service::Service;
pub use session::Session;
pub use store::Store;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use tracing::warn;

/// Prefix of environment variables overriding file values, e.g.
/// `OTTER_SERVICE__USER_TOKEN`.
pub const ENV_PREFIX: &str = "OTTER_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub service: Service,
    pub store: Store,
    pub session: Session,
    /// Named layouts of groups, each an ordered list of encounter groups.
    pub encounter_sets: BTreeMap<String, Vec<GroupSpec>>,
}

impl Config {
    /// Defaults overlaid with the environment. Overrides that do not fit
    /// the model are reported and the defaults are used instead.
    pub fn new() -> Self {
        Self::extract_or_default(Self::figment(None))
    }

    fn extract_or_default(figment: Figment) -> Self {
        match figment.extract() {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "ignoring invalid configuration overrides");
                Self::default()
            }
        }
    }

    /// Defaults, then the TOML file at `path`, then the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        Ok(Self::figment(Some(path)).extract()?)
    }

    /// Write the config back out as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let doc = toml_edit::ser::to_string_pretty(self)?;
        std::fs::write(path, doc)?;
        Ok(())
    }

    pub fn encounter_set(&self, name: &str) -> Result<&[GroupSpec], Error> {
        self.encounter_sets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownEncounterSet(name.to_owned()))
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const SAMPLE: &str = r#"
[service]
user_token = "abc123"
max_workers = 2

[service.retry]
backoff_factor = 50

[store]
path = "encounters.db"

[session]
include_failures = false
cutoff_hours = 0.5

[[encounter_sets.raids]]
name = "Wing 3"
encounters = ["esc", "kc", "tc", "xera"]

[[encounter_sets.raids]]
name = "Wing 4"
encounters = ["cairn", "mo", "sam", "dei"]
"#;

    #[test]
    fn load_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otter.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.service.user_token.as_deref(), Some("abc123"));
        assert_eq!(config.service.max_workers, 2);
        assert_eq!(config.service.parse_attempts, 3);
        assert_eq!(config.service.retry.backoff_factor, Duration::from_millis(50));
        assert_eq!(config.service.retry.total, 3);
        assert!(!config.session.include_failures);
        assert_eq!(config.session.cutoff(), Duration::from_secs(30 * 60));

        let groups = config.encounter_set("raids").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], GroupSpec::new("Wing 3", ["esc", "kc", "tc", "xera"]));
        assert_eq!(groups[1].name, "Wing 4");
    }

    #[test]
    fn invalid_override_falls_back_to_defaults() {
        let figment = Config::figment(None).merge(Serialized::default("service.max_workers", "many"));
        assert_eq!(Config::extract_or_default(figment), Config::default());

        let figment = Config::figment(None).merge(Serialized::default("service.max_workers", 7));
        assert_eq!(Config::extract_or_default(figment).service.max_workers, 7);
    }

    #[test]
    fn unknown_encounter_set_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.encounter_set("nope"),
            Err(Error::UnknownEncounterSet(name)) if name == "nope"
        ));
    }

    #[test]
    fn missing_file_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otter.toml");

        let mut config = Config::default();
        config.service.user_token = Some("minted".into());
        config
            .encounter_sets
            .insert("w3".into(), vec![GroupSpec::new("Wing 3", ["xera"])]);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.service.user_token.as_deref(), Some("minted"));
        assert_eq!(loaded.encounter_sets, config.encounter_sets);
    }
}
