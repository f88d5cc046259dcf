use crate::error::Error;
use glob::{Pattern, glob};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info, warn};
use tracker::EncounterCatalog;

const LOG_EXTENSION: &str = "zevtc";

/// Logs under `root` worth uploading.
///
/// `root` holds one folder per boss. Folders untouched since `cutoff`, or
/// whose encounter is not in `keys`, are skipped without looking inside;
/// within the rest, every `.zevtc` file modified after `cutoff` is taken.
pub fn scan_logs(
    root: &Path,
    cutoff: SystemTime,
    catalog: &dyn EncounterCatalog,
    keys: &HashSet<&str>,
) -> Result<Vec<PathBuf>, Error> {
    let root_pattern = Pattern::escape(&root.to_string_lossy());
    let mut logs = Vec::new();

    for dir in glob(&format!("{root_pattern}/*"))?.filter_map(Result::ok) {
        if !dir.is_dir() || !modified_since(&dir, cutoff) {
            continue;
        }
        let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let key = match catalog.resolve_by_folder(&name) {
            Ok(key) => key,
            Err(_) => {
                info!(folder = %name, "folder did not match known boss");
                continue;
            }
        };
        if !keys.contains(key) {
            continue;
        }

        debug!(folder = %name, "scanning");
        let dir_pattern = Pattern::escape(&dir.to_string_lossy());
        for log in glob(&format!("{dir_pattern}/*.{LOG_EXTENSION}"))?.filter_map(Result::ok) {
            if log.is_file() && modified_since(&log, cutoff) {
                debug!(path = %log.display(), "found log");
                logs.push(log);
            }
        }
    }

    logs.sort();
    Ok(logs)
}

fn modified_since(path: &Path, cutoff: SystemTime) -> bool {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified >= cutoff,
        Err(err) => {
            warn!(path = %path.display(), %err, "cannot stat");
            false
        }
    }
}

/// Every whitespace separated token of the file at `path` that looks like
/// a link.
pub fn read_links(path: &Path) -> Result<Vec<String>, Error> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })?;
    Ok(links(&content))
}

fn links(content: &str) -> Vec<String> {
    content
        .split_whitespace()
        .filter(|token| token.contains("http"))
        .map(str::to_owned)
        .collect()
}
