//! Identifier allocation and deduplication
//!
//! One `IdentifierAllocator` lives for exactly one anonymization run. It owns
//! the reverse index from original values to issued identifiers, so identical
//! input always receives the same identifier and the index is dropped with the
//! allocator.

use crate::crypto::Encryptor;
use crate::error::Result;
use crate::identifier::{IdentifierSource, RandomIdentifiers};
use crate::mapping::{Mapping, MappingEntry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// One identifier per distinct tuple of the selected columns.
    Composite,
    /// One identifier per distinct literal value, shared across all selected columns.
    PerValue,
}

impl DedupPolicy {
    /// Composite for multi-column selections, per-value otherwise.
    pub fn default_for(column_count: usize) -> Self {
        if column_count > 1 {
            DedupPolicy::Composite
        } else {
            DedupPolicy::PerValue
        }
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::Composite => f.write_str("composite"),
            DedupPolicy::PerValue => f.write_str("per-value"),
        }
    }
}

/// Structural cache key. Components are kept separate, so no delimiter can
/// make two different tuples collide, and a missing component never equals
/// an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<Option<String>>);

impl CacheKey {
    pub fn value(value: &str) -> Self {
        CacheKey(vec![Some(value.to_string())])
    }

    pub fn tuple(values: &[Option<&str>]) -> Self {
        CacheKey(values.iter().map(|v| v.map(str::to_string)).collect())
    }
}

pub struct IdentifierAllocator<S = RandomIdentifiers> {
    encryptor: Encryptor,
    source: S,
    reverse_index: HashMap<CacheKey, String>,
    issued: HashSet<String>,
    mapping: Mapping,
}

impl IdentifierAllocator<RandomIdentifiers> {
    pub fn new(encryptor: Encryptor) -> Self {
        Self::with_source(encryptor, RandomIdentifiers)
    }
}

impl<S: IdentifierSource> IdentifierAllocator<S> {
    pub fn with_source(encryptor: Encryptor, source: S) -> Self {
        Self {
            encryptor,
            source,
            reverse_index: HashMap::new(),
            issued: HashSet::new(),
            mapping: Mapping::new(),
        }
    }

    /// Per-value allocation. The same literal gets the same identifier
    /// regardless of which column it came from.
    pub fn allocate_value(&mut self, value: &str) -> Result<String> {
        let key = CacheKey::value(value);
        if let Some(existing) = self.reverse_index.get(&key) {
            return Ok(existing.clone());
        }

        let identifier = self.mint();
        let encrypted = self.encryptor.encrypt(value)?;
        self.mapping
            .insert(identifier.clone(), MappingEntry::Scalar(encrypted));
        self.reverse_index.insert(key, identifier.clone());
        Ok(identifier)
    }

    /// Composite allocation over `(column, value)` pairs in column order.
    /// Missing components are part of the cache key but are not stored.
    pub fn allocate_tuple(&mut self, components: &[(&str, Option<&str>)]) -> Result<String> {
        let values: Vec<Option<&str>> = components.iter().map(|(_, v)| *v).collect();
        let key = CacheKey::tuple(&values);
        if let Some(existing) = self.reverse_index.get(&key) {
            return Ok(existing.clone());
        }

        let identifier = self.mint();
        let mut fields = IndexMap::with_capacity(components.len());
        for (column, value) in components {
            if let Some(value) = value {
                fields.insert(column.to_string(), self.encryptor.encrypt(value)?);
            }
        }
        self.mapping
            .insert(identifier.clone(), MappingEntry::Fields(fields));
        self.reverse_index.insert(key, identifier.clone());
        Ok(identifier)
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Ends the run, discarding the reverse index.
    pub fn into_mapping(self) -> Mapping {
        debug!(
            "Allocator finished with {} identifiers ({} cache keys)",
            self.issued.len(),
            self.reverse_index.len()
        );
        self.mapping
    }

    fn mint(&mut self) -> String {
        loop {
            let candidate = self.source.next_identifier();
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
            warn!("Identifier collision on {}, regenerating", candidate);
        }
    }
}
