#![forbid(unsafe_code)]

use crate::{catalog::EncounterCatalog, error::Error, record::LogRecord};
use chrono::{DateTime, Utc};
use config::GroupSpec;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{debug, warn};

/// Attempts at one encounter during a session.
#[derive(Debug, Clone)]
pub struct EncounterBucket {
    pub key: String,
    pub name: String,
    /// Target ids accepted for this encounter.
    pub ids: Vec<u32>,
    successes: Vec<LogRecord>,
    failures: Vec<LogRecord>,
}

impl EncounterBucket {
    pub fn successes(&self) -> &[LogRecord] {
        &self.successes
    }

    pub fn failures(&self) -> &[LogRecord] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    fn clear(&mut self) {
        self.successes.clear();
        self.failures.clear();
    }

    fn records_mut(&mut self) -> impl Iterator<Item = &mut LogRecord> {
        self.successes.iter_mut().chain(self.failures.iter_mut())
    }
}

/// A named run of encounters, e.g. a raid wing.
#[derive(Debug, Clone)]
pub struct EncounterGroup {
    pub name: String,
    encounters: Vec<EncounterBucket>,
}

impl EncounterGroup {
    pub fn encounters(&self) -> &[EncounterBucket] {
        &self.encounters
    }

    pub fn get(&self, key: &str) -> Option<&EncounterBucket> {
        self.encounters.iter().find(|b| b.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.iter().all(EncounterBucket::is_empty)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut EncounterBucket> {
        self.encounters.iter_mut().find(|b| b.key == key)
    }
}

/// Logs of one play session, bucketed by group and encounter.
#[derive(Debug, Clone)]
pub struct SessionSet {
    groups: Vec<EncounterGroup>,
    date: Option<DateTime<Utc>>,
    catalog: Arc<dyn EncounterCatalog>,
}

impl SessionSet {
    /// Build the empty buckets. Every short key is resolved now, so an
    /// unknown key fails here rather than during classification.
    pub fn from_groups(specs: &[GroupSpec], catalog: Arc<dyn EncounterCatalog>) -> Result<Self, Error> {
        let mut groups = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut encounters = Vec::with_capacity(spec.encounters.len());
            for key in &spec.encounters {
                encounters.push(EncounterBucket {
                    key: key.clone(),
                    name: catalog.name_for_key(key)?.to_owned(),
                    ids: catalog.ids_for_key(key)?.to_vec(),
                    successes: Vec::new(),
                    failures: Vec::new(),
                });
            }
            groups.push(EncounterGroup {
                name: spec.name.clone(),
                encounters,
            });
        }
        Ok(Self {
            groups,
            date: None,
            catalog,
        })
    }

    pub fn groups(&self) -> &[EncounterGroup] {
        &self.groups
    }

    pub fn catalog(&self) -> &Arc<dyn EncounterCatalog> {
        &self.catalog
    }

    /// Encounter time of the first record classified since the last `clear`.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    /// Sort `logs` into the buckets. Records of encounters outside the
    /// configured groups are skipped, as are failures unless
    /// `include_failures`. Returns how many records were placed.
    pub fn fill_from_logs<I>(&mut self, logs: I, include_failures: bool) -> usize
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut placed = 0;
        for log in logs {
            let key = match self.catalog.resolve_by_id(log.encounter.boss_id) {
                Ok(key) => key.to_owned(),
                Err(err) => {
                    warn!(permalink = %log.permalink, %err, "skipping log of unknown encounter");
                    continue;
                }
            };
            if !log.encounter.success && !include_failures {
                continue;
            }

            let time = log.encounter_time;
            let mut matched = false;
            for group in &mut self.groups {
                let Some(bucket) = group.get_mut(&key) else {
                    continue;
                };
                if log.encounter.success {
                    bucket.successes.push(log.clone());
                } else {
                    bucket.failures.push(log.clone());
                }
                matched = true;
            }

            if matched {
                placed += 1;
                self.date.get_or_insert(time);
            } else {
                debug!(permalink = %log.permalink, %key, "log not in any group");
            }
        }
        placed
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(EncounterGroup::is_empty)
    }

    /// Every classified record: group order, then bucket order, successes
    /// before failures.
    pub fn logs(&self) -> Vec<&LogRecord> {
        self.groups
            .iter()
            .flat_map(|g| &g.encounters)
            .flat_map(|b| b.successes.iter().chain(&b.failures))
            .collect()
    }

    /// Configured short keys across all groups.
    pub fn encounter_keys(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| &g.encounters)
            .map(|b| b.key.as_str())
            .collect()
    }

    /// Swap classified records for updated copies with the same permalink,
    /// e.g. after their detail payloads were fetched.
    pub fn refresh<I>(&mut self, updated: I)
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let updated: HashMap<String, LogRecord> = updated
            .into_iter()
            .map(|log| (log.permalink.clone(), log))
            .collect();
        for group in &mut self.groups {
            for bucket in &mut group.encounters {
                for record in bucket.records_mut() {
                    if let Some(fresh) = updated.get(&record.permalink) {
                        *record = fresh.clone();
                    }
                }
            }
        }
    }

    /// Reset the date and empty every bucket.
    pub fn clear(&mut self) {
        self.date = None;
        for group in &mut self.groups {
            group.encounters.iter_mut().for_each(EncounterBucket::clear);
        }
    }

    /// Short title naming the non-empty groups. Names sharing a prefix and
    /// ending in numbers collapse into ranges: `Wing 1`, `Wing 3`, `Wing 4`
    /// gives `Wings 1,3-4`.
    pub fn title(&self) -> Option<String> {
        let names: Vec<&str> = self
            .groups
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| g.name.as_str())
            .collect();
        match names.as_slice() {
            [] => None,
            [only] => Some((*only).to_owned()),
            _ => Some(collapse_names(&names)),
        }
    }
}

fn collapse_names(names: &[&str]) -> String {
    let mut prefix = names[0];
    for name in &names[1..] {
        let common = prefix
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((idx, c), _)| idx + c.len_utf8());
        prefix = &prefix[..common];
    }
    let prefix = prefix.trim_end_matches(|c: char| c.is_ascii_digit());

    let numbers: Option<Vec<u32>> = names
        .iter()
        .map(|name| name[prefix.len()..].trim().parse().ok())
        .collect();
    let Some(mut numbers) = numbers else {
        return names.join(", ");
    };
    numbers.sort_unstable();
    numbers.dedup();

    let mut runs: Vec<(u32, u32)> = Vec::new();
    for n in numbers.iter().copied() {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => runs.push((n, n)),
        }
    }
    let ranges: Vec<String> = runs
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect();

    let mut label = prefix.trim().to_owned();
    if numbers.len() > 1 {
        label.push('s');
    }
    format!("{label} {}", ranges.join(","))
}

impl fmt::Display for SessionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            writeln!(f, "{}", group.name)?;
            for bucket in &group.encounters {
                writeln!(f, "--> {}", bucket.name)?;
                writeln!(f, "----> Success:")?;
                for log in &bucket.successes {
                    writeln!(f, "------> {}", log.permalink)?;
                }
                writeln!(f, "----> Failures:")?;
                for log in &bucket.failures {
                    writeln!(f, "------> {}", log.permalink)?;
                }
            }
        }
        Ok(())
    }
}
