//! Resolution of bare identifiers to a single original value
//!
//! Text documents reference identifiers without saying which column they
//! stand for. A multi-field mapping entry therefore has to be narrowed down to
//! one field. Resolution runs an ordered chain of strategies and takes the
//! first answer:
//!
//! 1. scalar entries resolve to their only value
//! 2. a field named after a column the identifier was observed in
//! 3. a field whose value is the identifier itself
//! 4. the first field, in column-set order, with a non-empty value
//! 5. any field with a non-empty value, in entry order
//!
//! If every strategy declines, the identifier stays unresolved.

use crate::crypto::Encryptor;
use crate::error::Warning;
use crate::identifier::is_identifier;
use crate::key::SecretKey;
use crate::mapping::{Mapping, MappingEntry};
use crate::table::Table;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Identifiers found in a reference table and the columns holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedIdentifiers {
    columns: IndexMap<String, Vec<String>>,
}

impl ObservedIdentifiers {
    /// Scans row by row. Identifiers keep first-seen order; each identifier's
    /// columns are listed in table column order.
    pub fn scan(table: &Table) -> Self {
        let mut indices: IndexMap<String, Vec<usize>> = IndexMap::new();
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate().take(table.headers.len()) {
                if let Some(value) = cell.as_deref().filter(|v| is_identifier(v)) {
                    indices.entry(value.to_string()).or_default().push(i);
                }
            }
        }

        let columns = indices
            .into_iter()
            .map(|(identifier, mut idx)| {
                idx.sort_unstable();
                idx.dedup();
                let names = idx.into_iter().map(|i| table.headers[i].clone()).collect();
                (identifier, names)
            })
            .collect();

        Self { columns }
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns_for(&self, identifier: &str) -> &[String] {
        self.columns
            .get(identifier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A mapping entry after decryption. `None` marks a value that failed to decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptedEntry {
    Scalar(Option<String>),
    Fields(IndexMap<String, Option<String>>),
}

pub struct ResolveContext<'a> {
    pub identifier: &'a str,
    pub observed_columns: &'a [String],
    pub column_set: &'a [String],
}

pub trait ResolveStrategy {
    fn name(&self) -> &'static str;

    fn resolve(&self, ctx: &ResolveContext<'_>, entry: &DecryptedEntry) -> Option<String>;
}

fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.is_empty())
}

pub struct ScalarValue;

impl ResolveStrategy for ScalarValue {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn resolve(&self, _ctx: &ResolveContext<'_>, entry: &DecryptedEntry) -> Option<String> {
        match entry {
            DecryptedEntry::Scalar(value) => value.clone(),
            DecryptedEntry::Fields(_) => None,
        }
    }
}

pub struct ObservedColumn;

impl ResolveStrategy for ObservedColumn {
    fn name(&self) -> &'static str {
        "observed-column"
    }

    fn resolve(&self, ctx: &ResolveContext<'_>, entry: &DecryptedEntry) -> Option<String> {
        let DecryptedEntry::Fields(fields) = entry else {
            return None;
        };
        ctx.observed_columns
            .iter()
            .find_map(|column| fields.get(column).cloned().flatten())
    }
}

pub struct SelfReference;

impl ResolveStrategy for SelfReference {
    fn name(&self) -> &'static str {
        "self-reference"
    }

    fn resolve(&self, ctx: &ResolveContext<'_>, entry: &DecryptedEntry) -> Option<String> {
        let DecryptedEntry::Fields(fields) = entry else {
            return None;
        };
        fields
            .values()
            .flatten()
            .find(|value| value.as_str() == ctx.identifier)
            .cloned()
    }
}

pub struct ColumnSetOrder;

impl ResolveStrategy for ColumnSetOrder {
    fn name(&self) -> &'static str {
        "column-set"
    }

    fn resolve(&self, ctx: &ResolveContext<'_>, entry: &DecryptedEntry) -> Option<String> {
        let DecryptedEntry::Fields(fields) = entry else {
            return None;
        };
        ctx.column_set
            .iter()
            .find_map(|column| fields.get(column).and_then(non_empty))
            .cloned()
    }
}

pub struct AnyField;

impl ResolveStrategy for AnyField {
    fn name(&self) -> &'static str {
        "any-field"
    }

    fn resolve(&self, _ctx: &ResolveContext<'_>, entry: &DecryptedEntry) -> Option<String> {
        let DecryptedEntry::Fields(fields) = entry else {
            return None;
        };
        fields.values().find_map(non_empty).cloned()
    }
}

pub fn default_strategies() -> Vec<Box<dyn ResolveStrategy>> {
    vec![
        Box::new(ScalarValue),
        Box::new(ObservedColumn),
        Box::new(SelfReference),
        Box::new(ColumnSetOrder),
        Box::new(AnyField),
    ]
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: IndexMap<String, String>,
    /// Name of the strategy that produced each resolved value.
    pub resolved_by: IndexMap<String, &'static str>,
    pub unresolved: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub struct FieldResolver<'a> {
    mapping: &'a Mapping,
    encryptor: Encryptor,
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(mapping: &'a Mapping, key: &SecretKey) -> Self {
        Self::with_strategies(mapping, key, default_strategies())
    }

    pub fn with_strategies(
        mapping: &'a Mapping,
        key: &SecretKey,
        strategies: Vec<Box<dyn ResolveStrategy>>,
    ) -> Self {
        Self {
            mapping,
            encryptor: Encryptor::new(key),
            strategies,
        }
    }

    pub fn resolve_all(&self, observed: &ObservedIdentifiers, column_set: &[String]) -> Resolution {
        let mut resolution = Resolution::default();

        for identifier in observed.identifiers() {
            let ctx = ResolveContext {
                identifier,
                observed_columns: observed.columns_for(identifier),
                column_set,
            };

            match self.resolve_one(&ctx, &mut resolution.warnings) {
                Some((value, strategy)) => {
                    debug!("Resolved {} via {}", identifier, strategy);
                    resolution.resolved.insert(identifier.to_string(), value);
                    resolution.resolved_by.insert(identifier.to_string(), strategy);
                }
                None => resolution.unresolved.push(identifier.to_string()),
            }
        }

        info!(
            "Resolved {} of {} identifiers",
            resolution.resolved.len(),
            observed.len()
        );
        resolution
    }

    pub fn resolve_one(
        &self,
        ctx: &ResolveContext<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Option<(String, &'static str)> {
        let Some(entry) = self.mapping.get(ctx.identifier) else {
            let warning = Warning::MissingIdentifier {
                identifier: ctx.identifier.to_string(),
            };
            warn!("{}", warning);
            warnings.push(warning);
            return None;
        };

        let decrypted = self.decrypt_entry(ctx.identifier, entry, warnings);
        self.strategies.iter().find_map(|strategy| {
            strategy
                .resolve(ctx, &decrypted)
                .map(|value| (value, strategy.name()))
        })
    }

    fn decrypt_entry(
        &self,
        identifier: &str,
        entry: &MappingEntry,
        warnings: &mut Vec<Warning>,
    ) -> DecryptedEntry {
        let mut decrypt = |token: &str, field: Option<&str>| match self.encryptor.decrypt(token) {
            Ok(value) => Some(value),
            Err(_) => {
                let warning = Warning::UndecryptableValue {
                    identifier: identifier.to_string(),
                    field: field.map(str::to_string),
                };
                warn!("{}", warning);
                warnings.push(warning);
                None
            }
        };

        match entry {
            MappingEntry::Scalar(token) => DecryptedEntry::Scalar(decrypt(token.as_str(), None)),
            MappingEntry::Fields(fields) => DecryptedEntry::Fields(
                fields
                    .iter()
                    .map(|(name, token)| (name.clone(), decrypt(token.as_str(), Some(name.as_str()))))
                    .collect(),
            ),
        }
    }
}
