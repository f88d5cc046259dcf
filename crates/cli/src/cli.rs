use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::{Path, PathBuf};

/// OtterLogger: arcdps log uploader and personal best tracker
///
/// Uploads fresh logs to dps.report, sorts them into the configured
/// encounter groups and keeps a history of kill times.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// Without one, defaults and `OTTER_*` environment variables are used.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Upload the latest session and report it.
    Post {
        /// Encounter set to sort logs into. Defaults to the configured one.
        encounter_set: Option<String>,

        /// Hours to go back for logs. Can be fractional.
        #[arg(short = 't', long = "time")]
        hours: Option<f64>,

        /// Take permalinks from this file instead of scanning the log folder.
        #[arg(short, long, value_parser = validate_file)]
        file: Option<PathBuf>,

        /// Leave failed attempts out.
        #[arg(long)]
        no_fails: bool,
    },

    /// Add one permalink per line of a file to the history, to be healed.
    Import {
        #[arg(value_parser = validate_file)]
        file: PathBuf,
    },

    /// Fill history rows that lack metadata.
    Heal,

    /// Show the best recorded time of an encounter.
    Best {
        /// Short key (e.g. `xera`) or boss name as the service reports it.
        boss: String,

        /// Challenge mode.
        #[arg(long)]
        cm: bool,

        /// First day to consider, `YYYY-MM-DD`.
        #[arg(long, value_parser = parse_day)]
        since: Option<DateTime<Utc>>,

        /// Day to stop at, `YYYY-MM-DD`.
        #[arg(long, value_parser = parse_day)]
        until: Option<DateTime<Utc>>,
    },

    /// Re-run the history one day at a time.
    Replay {
        encounter_set: Option<String>,

        #[arg(long, value_parser = parse_day)]
        since: Option<DateTime<Utc>>,

        #[arg(long, value_parser = parse_day)]
        until: Option<DateTime<Utc>>,
    },

    /// Request a new user token.
    Token {
        /// Store the token in the configuration file given with `-c`.
        #[arg(long)]
        save: bool,
    },

    /// List uploads tied to the user token.
    Uploads {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Local midnight of a `YYYY-MM-DD` day.
fn parse_day(day: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|err| format!("`{day}` is not a YYYY-MM-DD date: {err}"))?;
    date.and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .ok_or_else(|| format!("`{day}` has no local midnight"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_post_with_overrides() {
        let cli = Cli::try_parse_from(["otter-logger", "post", "raids", "-t", "1.5", "--no-fails"]).unwrap();
        match cli.command {
            Command::Post {
                encounter_set,
                hours,
                file,
                no_fails,
            } => {
                assert_eq!(encounter_set.as_deref(), Some("raids"));
                assert_eq!(hours, Some(1.5));
                assert!(file.is_none());
                assert!(no_fails);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn days_are_local_midnights() {
        let day = parse_day("2021-03-04").unwrap();
        assert_eq!(day.with_timezone(&Local).date_naive(), NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
        assert!(parse_day("04/03/2021").is_err());
    }
}
