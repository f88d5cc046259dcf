#![forbid(unsafe_code)]

use super::{EncounterCatalog, EncounterDefinition, table::BUILTIN};
use crate::error::Error;
use std::collections::HashMap;

/// Immutable catalog built once at startup.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    definitions: Vec<EncounterDefinition>,
    by_key: HashMap<String, usize>,
    by_id: HashMap<u32, usize>,
}

impl StaticCatalog {
    /// Index `definitions`, rejecting reused short keys or target ids.
    pub fn new(definitions: Vec<EncounterDefinition>) -> Result<Self, Error> {
        let mut by_key = HashMap::with_capacity(definitions.len());
        let mut by_id = HashMap::new();

        for (idx, def) in definitions.iter().enumerate() {
            if by_key.insert(def.key.clone(), idx).is_some() {
                return Err(Error::DuplicateKey(def.key.clone()));
            }
            for &id in &def.ids {
                if let Some(prev) = by_id.insert(id, idx) {
                    return Err(Error::DuplicateTarget {
                        id,
                        first: definitions[prev].key.clone(),
                        second: def.key.clone(),
                    });
                }
            }
        }

        Ok(Self {
            definitions,
            by_key,
            by_id,
        })
    }

    /// The built-in encounter table.
    pub fn builtin() -> Result<Self, Error> {
        let definitions = BUILTIN
            .iter()
            .map(|e| EncounterDefinition::new(e.key, e.name, e.folders.iter().copied(), e.ids))
            .collect();
        Self::new(definitions)
    }

    pub fn definitions(&self) -> &[EncounterDefinition] {
        &self.definitions
    }

    fn get(&self, key: &str) -> Result<&EncounterDefinition, Error> {
        self.by_key
            .get(key)
            .map(|&idx| &self.definitions[idx])
            .ok_or_else(|| Error::UnknownEncounter(key.to_owned()))
    }
}

impl EncounterCatalog for StaticCatalog {
    fn resolve_by_folder(&self, folder: &str) -> Result<&str, Error> {
        self.definitions
            .iter()
            .find(|def| def.folders.iter().any(|f| f == folder))
            .map(|def| def.key.as_str())
            .ok_or_else(|| Error::UnknownFolder(folder.to_owned()))
    }

    fn resolve_by_id(&self, id: u32) -> Result<&str, Error> {
        self.by_id
            .get(&id)
            .map(|&idx| self.definitions[idx].key.as_str())
            .ok_or(Error::UnknownTarget(id))
    }

    fn ids_for_key(&self, key: &str) -> Result<&[u32], Error> {
        self.get(key).map(|def| def.ids.as_slice())
    }

    fn name_for_key(&self, key: &str) -> Result<&str, Error> {
        self.get(key).map(|def| def.name.as_str())
    }

    fn resolve_by_name(&self, name: &str) -> Result<&str, Error> {
        self.definitions
            .iter()
            .find(|def| def.name == name)
            .or_else(|| {
                self.definitions
                    .iter()
                    .find(|def| def.folders.iter().any(|f| f == name))
            })
            .map(|def| def.key.as_str())
            .ok_or_else(|| Error::UnknownBoss(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::builtin().unwrap()
    }

    #[test]
    fn builtin_table_is_consistent() {
        let catalog = catalog();
        for def in catalog.definitions() {
            assert!(!def.ids.is_empty(), "{} has no ids", def.key);
            for &id in &def.ids {
                assert_eq!(catalog.resolve_by_id(id).unwrap(), def.key);
                assert!(catalog.ids_for_key(&def.key).unwrap().contains(&id));
            }
            for folder in &def.folders {
                assert_eq!(catalog.resolve_by_folder(folder).unwrap(), def.key);
            }
            assert_eq!(catalog.name_for_key(&def.key).unwrap(), def.name);
            assert_eq!(catalog.resolve_by_name(&def.name).unwrap(), def.key);
        }
    }

    #[test]
    fn multi_target_encounters_resolve_every_phase() {
        let catalog = catalog();
        for id in [16088, 16137, 16125] {
            assert_eq!(catalog.resolve_by_id(id).unwrap(), "trio");
        }
        assert_eq!(catalog.resolve_by_folder("Zane").unwrap(), "trio");
        assert_eq!(catalog.ids_for_key("qadim").unwrap().len(), 5);
    }

    #[test]
    fn unknown_lookups_are_not_found() {
        let catalog = catalog();
        assert!(matches!(catalog.resolve_by_id(1), Err(Error::UnknownTarget(1))));
        assert!(matches!(
            catalog.resolve_by_folder("Nowhere"),
            Err(Error::UnknownFolder(_))
        ));
        assert!(catalog.ids_for_key("nope").unwrap_err().is_not_found());
        assert!(catalog.name_for_key("nope").unwrap_err().is_not_found());
        assert!(catalog.resolve_by_name("Nobody").unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_target_ids_are_rejected() {
        let defs = vec![
            EncounterDefinition::new("a", "A", ["A"], [1, 2]),
            EncounterDefinition::new("b", "B", ["B"], [2]),
        ];
        assert!(matches!(
            StaticCatalog::new(defs),
            Err(Error::DuplicateTarget { id: 2, .. })
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let defs = vec![
            EncounterDefinition::new("a", "A", ["A"], [1]),
            EncounterDefinition::new("a", "Again", ["Again"], [2]),
        ];
        assert!(matches!(StaticCatalog::new(defs), Err(Error::DuplicateKey(k)) if k == "a"));
    }

    proptest! {
        #[test]
        fn id_key_ids_round_trip(def_idx in 0usize..1000, id_idx in 0usize..100) {
            let catalog = catalog();
            let defs = catalog.definitions();
            let def = &defs[def_idx % defs.len()];
            let id = def.ids[id_idx % def.ids.len()];

            let key = catalog.resolve_by_id(id).unwrap();
            prop_assert_eq!(key, def.key.as_str());
            prop_assert!(catalog.ids_for_key(key).unwrap().contains(&id));
        }
    }
}
