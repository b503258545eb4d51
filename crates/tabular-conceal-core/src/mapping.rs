//! Identifier mapping storage
//!
//! The mapping is persisted as a JSON object keyed by identifier. Each value
//! is either a single encrypted string or an object of encrypted strings keyed
//! by the originating column name.

use crate::error::{ConcealError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingEntry {
    Scalar(String),
    Fields(IndexMap<String, String>),
}

impl MappingEntry {
    pub fn is_scalar(&self) -> bool {
        matches!(self, MappingEntry::Scalar(_))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            MappingEntry::Scalar(_) => None,
            MappingEntry::Fields(fields) => fields.get(name).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    entries: IndexMap<String, MappingEntry>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: String, entry: MappingEntry) {
        self.entries.insert(identifier, entry);
    }

    pub fn get(&self, identifier: &str) -> Option<&MappingEntry> {
        self.entries.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappingEntry)> {
        self.entries.iter()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConcealError::MappingFormat(format!("not valid JSON: {}", e)))?;

        let object = value.as_object().ok_or_else(|| {
            ConcealError::MappingFormat("expected a JSON object keyed by identifier".to_string())
        })?;

        let mut mapping = Mapping::new();
        for (identifier, raw) in object {
            let entry: MappingEntry = serde_json::from_value(raw.clone()).map_err(|_| {
                ConcealError::MappingFormat(format!(
                    "entry for {} must be a string or an object of strings",
                    identifier
                ))
            })?;
            mapping.insert(identifier.clone(), entry);
        }

        Ok(mapping)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConcealError::MappingFormat(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConcealError::MappingFormat(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mapping = Self::from_json(&contents)?;
        info!("Loaded {} mapping entries from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        debug!("Wrote {} mapping entries to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    pub fn statistics(&self) -> MappingStatistics {
        let mut stats = MappingStatistics {
            total_entries: self.entries.len(),
            ..Default::default()
        };

        for entry in self.entries.values() {
            match entry {
                MappingEntry::Scalar(_) => stats.scalar_entries += 1,
                MappingEntry::Fields(fields) => {
                    stats.field_entries += 1;
                    for field in fields.keys() {
                        *stats.entries_by_field.entry(field.clone()).or_insert(0) += 1;
                    }
                }
            }
        }

        stats
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MappingStatistics {
    pub total_entries: usize,
    pub scalar_entries: usize,
    pub field_entries: usize,
    pub entries_by_field: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fields(pairs: &[(&str, &str)]) -> MappingEntry {
        MappingEntry::Fields(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_parse_both_entry_shapes() {
        let json = r#"{
            "11111111-1111-4111-8111-111111111111": "gAAAAscalar",
            "22222222-2222-4222-8222-222222222222": {"name": "gAAAAname", "email": "gAAAAemail"}
        }"#;

        let mapping = Mapping::from_json(json).unwrap();
        assert_eq!(mapping.len(), 2);

        let scalar = mapping.get("11111111-1111-4111-8111-111111111111").unwrap();
        assert_eq!(scalar, &MappingEntry::Scalar("gAAAAscalar".to_string()));

        let multi = mapping.get("22222222-2222-4222-8222-222222222222").unwrap();
        assert_eq!(multi.field("email"), Some("gAAAAemail"));
        assert_eq!(multi.field("phone"), None);
    }

    #[test]
    fn test_field_order_preserved() {
        let json = r#"{"id": {"zeta": "z", "alpha": "a", "mid": "m"}}"#;
        let mapping = Mapping::from_json(json).unwrap();

        match mapping.get("id").unwrap() {
            MappingEntry::Fields(fields) => {
                let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_object_top_level() {
        let err = Mapping::from_json(r#"["a", "b"]"#).unwrap_err();
        assert!(matches!(err, ConcealError::MappingFormat(_)));
    }

    #[test]
    fn test_rejects_bad_entry_values() {
        for json in [
            r#"{"id": 42}"#,
            r#"{"id": {"name": 1}}"#,
            r#"{"id": ["a"]}"#,
            r#"{"id": null}"#,
        ] {
            let err = Mapping::from_json(json).unwrap_err();
            assert!(matches!(err, ConcealError::MappingFormat(_)), "{}", json);
        }
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(matches!(
            Mapping::from_json("{not json"),
            Err(ConcealError::MappingFormat(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mapping.json");

        let mut mapping = Mapping::new();
        mapping.insert("a".to_string(), MappingEntry::Scalar("x".to_string()));
        mapping.insert("b".to_string(), fields(&[("name", "y"), ("email", "z")]));
        mapping.save(&path).unwrap();

        let loaded = Mapping::load(&path).unwrap();
        assert_eq!(loaded, mapping);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Mapping::load(temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConcealError::MappingFormat(_)));
    }

    #[test]
    fn test_statistics() {
        let mut mapping = Mapping::new();
        mapping.insert("a".to_string(), MappingEntry::Scalar("x".to_string()));
        mapping.insert("b".to_string(), fields(&[("name", "y"), ("email", "z")]));
        mapping.insert("c".to_string(), fields(&[("name", "w")]));

        let stats = mapping.statistics();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.scalar_entries, 1);
        assert_eq!(stats.field_entries, 2);
        assert_eq!(stats.entries_by_field.get("name"), Some(&2));
        assert_eq!(stats.entries_by_field.get("email"), Some(&1));
    }
}
