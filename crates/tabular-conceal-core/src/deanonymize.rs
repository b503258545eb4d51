//! Table de-anonymization
//!
//! Pseudonymized columns are recognised by their values alone; the caller
//! does not say which columns were anonymized.

use crate::crypto::Encryptor;
use crate::error::Warning;
use crate::identifier::is_identifier;
use crate::key::SecretKey;
use crate::mapping::{Mapping, MappingEntry};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How a column is classified as pseudonymized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDetection {
    /// Only the first non-missing cell is inspected. A coincidental match in
    /// that cell causes a false positive; identifiers that only appear after
    /// a non-matching first cell are missed.
    FirstPresent,
    /// Every non-missing cell must be an identifier.
    #[default]
    AllPresent,
    /// At least this fraction of non-missing cells must be identifiers.
    MinFraction(f64),
}

impl ColumnDetection {
    /// Columns with no present cells are never detected.
    pub fn detect(&self, table: &Table) -> Vec<usize> {
        (0..table.headers.len())
            .filter(|&i| self.matches(table.column_values(i).flatten()))
            .collect()
    }

    fn matches<'a>(&self, mut present: impl Iterator<Item = &'a str>) -> bool {
        match self {
            ColumnDetection::FirstPresent => present.next().is_some_and(is_identifier),
            ColumnDetection::AllPresent => {
                let mut seen = false;
                for value in present {
                    if !is_identifier(value) {
                        return false;
                    }
                    seen = true;
                }
                seen
            }
            ColumnDetection::MinFraction(min) => {
                let (mut total, mut hits) = (0usize, 0usize);
                for value in present {
                    total += 1;
                    if is_identifier(value) {
                        hits += 1;
                    }
                }
                total > 0 && (hits as f64 / total as f64) >= *min
            }
        }
    }
}

#[derive(Debug)]
pub struct DeanonymizationOutput {
    pub table: Table,
    pub detected_columns: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub struct TabularDeanonymizer<'a> {
    mapping: &'a Mapping,
    encryptor: Encryptor,
    detection: ColumnDetection,
}

impl<'a> TabularDeanonymizer<'a> {
    pub fn new(mapping: &'a Mapping, key: &SecretKey, detection: ColumnDetection) -> Self {
        Self {
            mapping,
            encryptor: Encryptor::new(key),
            detection,
        }
    }

    pub fn deanonymize(&self, table: &Table) -> DeanonymizationOutput {
        let detected = self.detection.detect(table);
        let detected_columns: Vec<String> =
            detected.iter().map(|&i| table.headers[i].clone()).collect();
        info!("Detected anonymized columns: {:?}", detected_columns);

        let mut output = table.clone();
        let mut warnings = Vec::new();

        for &i in &detected {
            let column = &table.headers[i];
            for row in output.rows.iter_mut() {
                let Some(cell) = row.get_mut(i) else {
                    continue;
                };
                let Some(identifier) = cell.as_deref() else {
                    continue;
                };
                match self.restore_cell(identifier, column) {
                    Ok(value) => *cell = Some(value),
                    Err(warning) => {
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }
        }

        debug!(
            "Restored {} columns with {} warnings",
            detected_columns.len(),
            warnings.len()
        );
        DeanonymizationOutput {
            table: output,
            detected_columns,
            warnings,
        }
    }

    fn restore_cell(&self, identifier: &str, column: &str) -> Result<String, Warning> {
        let entry = self
            .mapping
            .get(identifier)
            .ok_or_else(|| Warning::MissingIdentifier {
                identifier: identifier.to_string(),
            })?;

        let (token, field) = match entry {
            MappingEntry::Scalar(token) => (token.as_str(), None),
            MappingEntry::Fields(fields) => {
                let token = fields.get(column).ok_or_else(|| Warning::MissingField {
                    identifier: identifier.to_string(),
                    column: column.to_string(),
                })?;
                (token.as_str(), Some(column.to_string()))
            }
        };

        self.encryptor
            .decrypt(token)
            .map_err(|_| Warning::UndecryptableValue {
                identifier: identifier.to_string(),
                field,
            })
    }
}
