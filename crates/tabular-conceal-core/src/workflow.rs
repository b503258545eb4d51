//! File-level operations behind the CLI commands
//!
//! Each operation reads every input first, then computes, then writes. A
//! boundary failure therefore never leaves partial output behind.

use crate::allocator::DedupPolicy;
use crate::anonymize::TabularAnonymizer;
use crate::config::Config;
use crate::deanonymize::TabularDeanonymizer;
use crate::document::TextDocument;
use crate::error::{Result, Warning};
use crate::key::SecretKey;
use crate::mapping::{Mapping, MappingStatistics};
use crate::resolver::{FieldResolver, ObservedIdentifiers};
use crate::rewriter::TextRewriter;
use crate::table::Table;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct AnonymizeRequest {
    pub table: PathBuf,
    pub columns: Vec<String>,
    pub output_dir: PathBuf,
    /// Overrides the configured policy when set.
    pub policy: Option<DedupPolicy>,
}

#[derive(Debug, Clone)]
pub struct AnonymizeSummary {
    pub anonymized_path: PathBuf,
    pub mapping_path: PathBuf,
    pub key_path: PathBuf,
    pub rows: usize,
    pub entries: usize,
    pub policy: DedupPolicy,
}

pub fn anonymize_file(request: &AnonymizeRequest, config: &Config) -> Result<AnonymizeSummary> {
    let table = Table::read_csv(&request.table)?;
    info!("Loaded {} rows from {}", table.rows.len(), request.table.display());

    let policy = request.policy.or(config.anonymize.policy.as_policy());
    let anonymizer = TabularAnonymizer::new(request.columns.clone(), policy)?;
    let output = anonymizer.anonymize(&table)?;

    std::fs::create_dir_all(&request.output_dir)?;
    let anonymized_path = request.output_dir.join(&config.anonymize.anonymized_file);
    let mapping_path = request.output_dir.join(&config.anonymize.mapping_file);
    let key_path = request.output_dir.join(&config.anonymize.key_file);

    output.table.write_csv(&anonymized_path)?;
    output.mapping.save(&mapping_path)?;
    output.key.save(&key_path)?;

    info!("Anonymization complete. Files saved to {}", request.output_dir.display());
    Ok(AnonymizeSummary {
        anonymized_path,
        mapping_path,
        key_path,
        rows: output.table.rows.len(),
        entries: output.mapping.len(),
        policy: output.policy,
    })
}

#[derive(Debug, Clone)]
pub struct DeanonymizeRequest {
    pub anonymized: PathBuf,
    pub mapping: PathBuf,
    pub key: PathBuf,
    /// Defaults to the configured restored file name in the working directory.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DeanonymizeSummary {
    pub output_path: PathBuf,
    pub detected_columns: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub fn deanonymize_file(request: &DeanonymizeRequest, config: &Config) -> Result<DeanonymizeSummary> {
    let key = SecretKey::load(&request.key)?;
    let mapping = Mapping::load(&request.mapping)?;
    let table = Table::read_csv(&request.anonymized)?;

    let output = TabularDeanonymizer::new(&mapping, &key, config.deanonymize.detection)
        .deanonymize(&table);

    let output_path = request
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.deanonymize.restored_file));
    output.table.write_csv(&output_path)?;

    info!("Restoration complete. File saved to {}", output_path.display());
    Ok(DeanonymizeSummary {
        output_path,
        detected_columns: output.detected_columns,
        warnings: output.warnings,
    })
}

#[derive(Debug, Clone)]
pub struct RewriteRequest {
    pub document: PathBuf,
    pub mapping: PathBuf,
    pub key: PathBuf,
    /// Anonymized table used to learn which column each identifier came from.
    pub reference_table: PathBuf,
    /// Field preference order; defaults to the reference table's headers.
    pub columns: Option<Vec<String>>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RewriteSummary {
    pub output_path: PathBuf,
    pub identifiers_found: usize,
    pub resolved: usize,
    pub replacements: usize,
    pub blocks_changed: usize,
    pub unresolved: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub fn rewrite_document(request: &RewriteRequest, config: &Config) -> Result<RewriteSummary> {
    let key = SecretKey::load(&request.key)?;
    let mapping = Mapping::load(&request.mapping)?;
    let reference = Table::read_csv(&request.reference_table)?;
    let mut document = TextDocument::read(&request.document)?;

    let observed = ObservedIdentifiers::scan(&reference);
    info!(
        "Found {} identifiers across {} reference columns",
        observed.len(),
        reference.headers.len()
    );

    let column_set = request
        .columns
        .clone()
        .unwrap_or_else(|| reference.headers.clone());
    let resolution = FieldResolver::new(&mapping, &key).resolve_all(&observed, &column_set);

    let stats = TextRewriter::new(&resolution.resolved)?.rewrite_document(&mut document);

    let output_path = request
        .output
        .clone()
        .unwrap_or_else(|| default_rewrite_path(&request.document, &config.rewrite.output_suffix));
    document.write(&output_path)?;

    info!("Done! Output saved to {}", output_path.display());
    Ok(RewriteSummary {
        output_path,
        identifiers_found: observed.len(),
        resolved: resolution.resolved.len(),
        replacements: stats.replacements,
        blocks_changed: stats.blocks_changed,
        unresolved: resolution.unresolved,
        warnings: resolution.warnings,
    })
}

pub fn mapping_statistics<P: AsRef<Path>>(path: P) -> Result<MappingStatistics> {
    Ok(Mapping::load(path)?.statistics())
}

/// `<dir>/<stem><suffix>.<ext>` beside the input document.
pub fn default_rewrite_path(document: &Path, suffix: &str) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let file_name = match document.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    document.with_file_name(file_name)
}
