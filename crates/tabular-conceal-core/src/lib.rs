pub mod allocator;
pub mod anonymize;
pub mod config;
pub mod crypto;
pub mod deanonymize;
pub mod document;
pub mod error;
pub mod identifier;
pub mod key;
pub mod mapping;
pub mod resolver;
pub mod rewriter;
pub mod table;
pub mod workflow;

#[cfg(test)]
pub mod integration_tests;

pub use allocator::{CacheKey, DedupPolicy, IdentifierAllocator};
pub use anonymize::{AnonymizationOutput, TabularAnonymizer};
pub use config::{AnonymizeConfig, Config, DeanonymizeConfig, PolicyChoice, RewriteConfig};
pub use crypto::Encryptor;
pub use deanonymize::{ColumnDetection, DeanonymizationOutput, TabularDeanonymizer};
pub use document::TextDocument;
pub use error::{ConcealError, Result, Warning};
pub use identifier::{find_identifiers, is_identifier, IdentifierSource, RandomIdentifiers};
pub use key::SecretKey;
pub use mapping::{Mapping, MappingEntry, MappingStatistics};
pub use resolver::{FieldResolver, ObservedIdentifiers, Resolution, ResolveStrategy};
pub use rewriter::{RewriteStats, TextRewriter};
pub use table::Table;
pub use workflow::{
    anonymize_file, deanonymize_file, mapping_statistics, rewrite_document, AnonymizeRequest,
    AnonymizeSummary, DeanonymizeRequest, DeanonymizeSummary, RewriteRequest, RewriteSummary,
};
