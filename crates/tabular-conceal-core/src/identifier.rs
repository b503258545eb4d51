//! Identifier issuance and pattern matching
//!
//! Identifiers are random UUIDv4 values in their canonical lowercase
//! 8-4-4-4-12 hex form.

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

pub const IDENTIFIER_PATTERN: &str =
    r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

/// Source of fresh identifiers. The allocator checks uniqueness itself.
pub trait IdentifierSource {
    fn next_identifier(&mut self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentifiers;

impl IdentifierSource for RandomIdentifiers {
    fn next_identifier(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

fn exact() -> &'static Regex {
    static EXACT: OnceLock<Regex> = OnceLock::new();
    EXACT.get_or_init(|| {
        Regex::new(&format!("^{}$", IDENTIFIER_PATTERN)).expect("identifier pattern is valid")
    })
}

pub(crate) fn embedded_pattern() -> &'static Regex {
    static EMBEDDED: OnceLock<Regex> = OnceLock::new();
    EMBEDDED.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid"))
}

/// True when the whole value is a canonical identifier.
pub fn is_identifier(value: &str) -> bool {
    exact().is_match(value)
}

/// Identifiers embedded in free text, left to right, non-overlapping.
pub fn find_identifiers(text: &str) -> impl Iterator<Item = &str> {
    embedded_pattern().find_iter(text).map(|m| m.as_str())
}
