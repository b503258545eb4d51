//! Error and warning types shared by the core engines

use std::fmt;
use thiserror::Error;

/// Fatal failures. Any of these aborts the operation before output is written.
#[derive(Debug, Error)]
pub enum ConcealError {
    #[error("column '{column}' not found in table (available: {})", available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("no columns selected for anonymization")]
    EmptyColumnSet,

    #[error("invalid key: {0}")]
    KeyFormat(String),

    #[error("invalid mapping: {0}")]
    MappingFormat(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("invalid table: {0}")]
    TableFormat(String),

    #[error("cannot build identifier matcher: {0}")]
    Matcher(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ConcealError {
    fn from(err: csv::Error) -> Self {
        ConcealError::TableFormat(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConcealError>;

/// Recoverable per-cell problems. The affected cell keeps its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Identifier absent from the mapping.
    MissingIdentifier { identifier: String },
    /// Multi-field entry has no field for the column the identifier sits in.
    MissingField { identifier: String, column: String },
    /// Stored ciphertext failed authentication.
    UndecryptableValue {
        identifier: String,
        field: Option<String>,
    },
}

impl Warning {
    pub fn identifier(&self) -> &str {
        match self {
            Warning::MissingIdentifier { identifier }
            | Warning::MissingField { identifier, .. }
            | Warning::UndecryptableValue { identifier, .. } => identifier,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingIdentifier { identifier } => {
                write!(f, "no mapping found for identifier {}", identifier)
            }
            Warning::MissingField { identifier, column } => {
                write!(f, "mapping for {} has no field '{}'", identifier, column)
            }
            Warning::UndecryptableValue { identifier, field: Some(field) } => {
                write!(f, "could not decrypt field '{}' of {}", field, identifier)
            }
            Warning::UndecryptableValue { identifier, field: None } => {
                write!(f, "could not decrypt value of {}", identifier)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_lists_available() {
        let err = ConcealError::ColumnNotFound {
            column: "ssn".to_string(),
            available: vec!["name".to_string(), "email".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "column 'ssn' not found in table (available: name, email)"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::MissingField {
            identifier: "abc".to_string(),
            column: "email".to_string(),
        };
        assert_eq!(warning.to_string(), "mapping for abc has no field 'email'");
        assert_eq!(warning.identifier(), "abc");
    }
}
