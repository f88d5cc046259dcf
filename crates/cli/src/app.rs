use crate::{
    cli::{Cli, Command},
    error::Error,
    scan::{read_links, scan_logs},
};
use chrono::{DateTime, Utc};
use config::Config;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tracing::{info, warn};
use tracker::{
    EncounterCatalog, EncounterStore, LogRecord, LogRef, ReportClient, SessionSet, SessionSink, StaticCatalog,
    TracingSink, accepted_logs,
};

/// Everything a command needs, built once from the configuration.
pub struct App {
    config: Config,
    conffile: Option<PathBuf>,
    catalog: Arc<StaticCatalog>,
    client: ReportClient,
}

impl App {
    pub fn new(config: Config, conffile: Option<PathBuf>) -> anyhow::Result<Self> {
        let catalog = Arc::new(StaticCatalog::builtin()?);
        let client = ReportClient::from_config(&config.service)?;
        Ok(Self {
            config,
            conffile,
            catalog,
            client,
        })
    }

    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Post {
                encounter_set,
                hours,
                file,
                no_fails,
            } => self.post(encounter_set, hours, file, no_fails).await,
            Command::Import { file } => self.import(&file).await,
            Command::Heal => self.heal().await,
            Command::Best {
                boss,
                cm,
                since,
                until,
            } => self.best(&boss, cm, since, until).await,
            Command::Replay {
                encounter_set,
                since,
                until,
            } => self.replay(encounter_set, since, until).await,
            Command::Token { save } => self.token(save).await,
            Command::Uploads { page } => self.uploads(page).await,
        }
    }

    fn session_set(&self, name: Option<String>) -> anyhow::Result<SessionSet> {
        let name = name
            .or_else(|| self.config.session.encounter_set.clone())
            .ok_or(Error::NoEncounterSet)?;
        info!(encounter_set = %name, "using encounter set");
        let groups = self.config.encounter_set(&name)?;
        Ok(SessionSet::from_groups(groups, self.catalog.clone())?)
    }

    async fn store(&self) -> anyhow::Result<Option<EncounterStore>> {
        match &self.config.store.path {
            Some(path) => Ok(Some(EncounterStore::open(path.clone()).await?)),
            None => Ok(None),
        }
    }

    async fn require_store(&self) -> anyhow::Result<EncounterStore> {
        Ok(self.store().await?.ok_or(Error::NoStore)?)
    }

    async fn post(
        &self,
        encounter_set: Option<String>,
        hours: Option<f64>,
        file: Option<PathBuf>,
        no_fails: bool,
    ) -> anyhow::Result<()> {
        let mut set = self.session_set(encounter_set)?;
        let store = self.store().await?;

        let logs = match file {
            Some(file) => {
                info!(file = %file.display(), "using logs from file");
                self.resolve_links(&file).await?
            }
            None => {
                let mut session = self.config.session.clone();
                if let Some(hours) = hours {
                    session.cutoff_hours = hours;
                }
                let cutoff = SystemTime::now()
                    .checked_sub(session.cutoff())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                info!(cutoff = %DateTime::<Utc>::from(cutoff), "scanning for logs");

                let root = session.log_folder.as_deref().ok_or(Error::NoLogFolder)?;
                let keys = set.encounter_keys().into_iter().collect::<HashSet<_>>();
                let paths = scan_logs(root, cutoff, self.catalog.as_ref(), &keys)?;
                accepted_logs(self.client.upload_logs(paths).await)
            }
        };

        if logs.is_empty() {
            info!("no logs found after criteria applied");
            return Ok(());
        }
        for log in &logs {
            info!(permalink = %log.permalink, "log");
        }

        let logs = match &store {
            Some(store) => {
                let report = store.import_logs(logs, &self.client).await?;
                info!(
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    failed = report.failed.len(),
                    "imported"
                );
                report.logs
            }
            None => logs,
        };

        let include_failures = self.config.session.include_failures && !no_fails;
        set.fill_from_logs(logs, include_failures);
        info!("session\n{set}");

        // details are needed for every kill anyway; fetch them in bulk
        let batch = self
            .client
            .get_jsons(set.logs().into_iter().cloned().collect())
            .await;
        for (log, err) in &batch.failed {
            warn!(permalink = %log.permalink, %err, "no detail payload");
        }
        set.refresh(batch.done);

        TracingSink.publish(&set, store.as_ref()).await?;
        Ok(())
    }

    async fn resolve_links(&self, file: &Path) -> anyhow::Result<Vec<LogRecord>> {
        let links = read_links(file)?
            .into_iter()
            .map(LogRef::Permalink)
            .collect::<Vec<_>>();
        let batch = self.client.get_upload_metadatas(links).await;
        for (log, err) in &batch.failed {
            warn!(%log, %err, "could not resolve link");
        }
        Ok(batch.done)
    }

    async fn import(&self, file: &Path) -> anyhow::Result<()> {
        let store = self.require_store().await?;
        let report = store.load_from_file(file).await?;
        info!(inserted = report.inserted, duplicates = report.duplicates, "links loaded, run `heal` to fill them");
        Ok(())
    }

    async fn heal(&self) -> anyhow::Result<()> {
        let store = self.require_store().await?;
        let report = store.update_fields(&self.client).await?;
        for (permalink, err) in &report.failed {
            warn!(%permalink, %err, "could not heal");
        }
        info!(updated = report.updated, failed = report.failed.len(), "healed");
        Ok(())
    }

    async fn best(
        &self,
        boss: &str,
        cm: bool,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        let store = self.require_store().await?;
        let boss = self.catalog.name_for_key(boss).unwrap_or(boss);
        match store.best_time(boss, cm, since, until).await? {
            Some(best) => info!(%boss, cm, time = %best.time, permalink = %best.permalink, "best time"),
            None => info!(%boss, cm, "no successful kill recorded"),
        }
        Ok(())
    }

    async fn replay(
        &self,
        encounter_set: Option<String>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        let store = self.require_store().await?;
        let mut set = self.session_set(encounter_set)?;
        let sessions = store.replay_history(&mut set, since, until, &TracingSink).await?;
        info!(sessions, "replay finished");
        Ok(())
    }

    async fn token(&self, save: bool) -> anyhow::Result<()> {
        let token = self.client.get_user_token().await?;
        info!(%token, "new user token");
        if save {
            let path = self.conffile.as_deref().ok_or(Error::NoConffile)?;
            let mut config = self.config.clone();
            config.service.user_token = Some(token);
            config.save(path)?;
            info!(path = %path.display(), "token saved");
        }
        Ok(())
    }

    async fn uploads(&self, page: u32) -> anyhow::Result<()> {
        let uploads = self.client.get_uploads(page).await?;
        if uploads.is_empty() {
            info!(page, "no uploads");
        }
        for log in uploads {
            info!(
                permalink = %log.permalink,
                boss = %log.encounter.boss,
                success = log.encounter.success,
                at = %log.encounter_time,
                "upload"
            );
        }
        Ok(())
    }
}

/// Load the configuration named on the command line, or defaults.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    Ok(match &cli.conffile {
        Some(path) => Config::load(path)?,
        None => Config::new(),
    })
}

