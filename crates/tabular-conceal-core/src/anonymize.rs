//! Table anonymization

use crate::allocator::{DedupPolicy, IdentifierAllocator};
use crate::crypto::Encryptor;
use crate::error::{ConcealError, Result};
use crate::key::SecretKey;
use crate::mapping::Mapping;
use crate::table::Table;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug)]
pub struct AnonymizationOutput {
    pub table: Table,
    pub mapping: Mapping,
    pub key: SecretKey,
    pub policy: DedupPolicy,
}

pub struct TabularAnonymizer {
    columns: Vec<String>,
    policy: DedupPolicy,
}

impl TabularAnonymizer {
    /// `policy` of `None` picks composite for several columns, per-value for one.
    /// Repeated column names are collapsed to their first occurrence.
    pub fn new(columns: Vec<String>, policy: Option<DedupPolicy>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ConcealError::EmptyColumnSet);
        }
        let mut seen = HashSet::new();
        let columns: Vec<String> = columns
            .into_iter()
            .filter(|column| seen.insert(column.clone()))
            .collect();
        let policy = policy.unwrap_or_else(|| DedupPolicy::default_for(columns.len()));
        Ok(Self { columns, policy })
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Anonymizes with a freshly generated key.
    pub fn anonymize(&self, table: &Table) -> Result<AnonymizationOutput> {
        self.anonymize_with_key(table, SecretKey::generate())
    }

    pub fn anonymize_with_key(&self, table: &Table, key: SecretKey) -> Result<AnonymizationOutput> {
        let indices = self.resolve_columns(table)?;
        let allocator = IdentifierAllocator::new(Encryptor::new(&key));

        info!(
            "Anonymizing {} rows over columns [{}] using {} policy",
            table.rows.len(),
            self.columns.join(", "),
            self.policy
        );

        let (anonymized, mapping) = match self.policy {
            DedupPolicy::Composite => self.run_composite(table, &indices, allocator)?,
            DedupPolicy::PerValue => self.run_per_value(table, &indices, allocator)?,
        };

        info!("Issued {} identifiers", mapping.len());
        Ok(AnonymizationOutput {
            table: anonymized,
            mapping,
            key,
            policy: self.policy,
        })
    }

    fn resolve_columns(&self, table: &Table) -> Result<Vec<usize>> {
        self.columns
            .iter()
            .map(|column| {
                table
                    .column_index(column)
                    .ok_or_else(|| ConcealError::ColumnNotFound {
                        column: column.clone(),
                        available: table.headers.clone(),
                    })
            })
            .collect()
    }

    fn run_composite(
        &self,
        table: &Table,
        indices: &[usize],
        mut allocator: IdentifierAllocator,
    ) -> Result<(Table, Mapping)> {
        let mut output = table.clone();

        for (row_number, row) in output.rows.iter_mut().enumerate() {
            let components: Vec<(&str, Option<&str>)> = self
                .columns
                .iter()
                .zip(indices)
                .map(|(column, &i)| {
                    let value = table.rows[row_number].get(i).and_then(|c| c.as_deref());
                    (column.as_str(), value)
                })
                .collect();

            if components.iter().all(|(_, v)| v.is_none()) {
                debug!("Row {} has no values in selected columns", row_number);
                continue;
            }

            let identifier = allocator.allocate_tuple(&components)?;
            for &i in indices {
                if let Some(cell) = row.get_mut(i).filter(|c| c.is_some()) {
                    *cell = Some(identifier.clone());
                }
            }
        }

        Ok((output, allocator.into_mapping()))
    }

    fn run_per_value(
        &self,
        table: &Table,
        indices: &[usize],
        mut allocator: IdentifierAllocator,
    ) -> Result<(Table, Mapping)> {
        let mut output = table.clone();

        for &i in indices {
            for row in output.rows.iter_mut() {
                if let Some(cell) = row.get_mut(i) {
                    if let Some(value) = cell.take() {
                        *cell = Some(allocator.allocate_value(&value)?);
                    }
                }
            }
        }

        Ok((output, allocator.into_mapping()))
    }
}
