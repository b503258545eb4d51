use crate::allocator::DedupPolicy;
use crate::config::Config;
use crate::error::{ConcealError, Warning};
use crate::identifier::is_identifier;
use crate::mapping::{Mapping, MappingEntry};
use crate::table::Table;
use crate::workflow::{
    anonymize_file, deanonymize_file, mapping_statistics, rewrite_document, AnonymizeRequest,
    DeanonymizeRequest, RewriteRequest,
};
use anyhow::Result;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

const PEOPLE_CSV: &str = "\
name,email,department
Alice,a@x.com,Cardiology
Bob,b@x.com,Oncology
Alice,a@x.com,Cardiology
";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

fn write_input(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn anonymize(dir: &TempDir, columns: &[&str], policy: Option<DedupPolicy>) -> Result<AnonymizeRequest> {
    let input = write_input(dir.path(), "people.csv", PEOPLE_CSV);
    Ok(AnonymizeRequest {
        table: input,
        columns: columns.iter().map(|c| c.to_string()).collect(),
        output_dir: dir.path().join("out"),
        policy,
    })
}

#[test]
fn test_file_roundtrip_composite() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let config = Config::default();

    let request = anonymize(&temp_dir, &["name", "email"], None)?;
    let summary = anonymize_file(&request, &config)?;

    assert_eq!(summary.policy, DedupPolicy::Composite);
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.entries, 2);
    assert!(summary.anonymized_path.ends_with("out/anonymized.csv"));
    assert!(summary.key_path.exists());

    let anonymized = Table::read_csv(&summary.anonymized_path)?;
    let first = anonymized.cell(0, "name").unwrap();
    assert!(is_identifier(first));
    assert_eq!(anonymized.cell(0, "email"), Some(first));
    assert_eq!(anonymized.cell(2, "name"), Some(first));
    assert_ne!(anonymized.cell(1, "name"), Some(first));
    assert_eq!(anonymized.cell(1, "department"), Some("Oncology"));

    let mapping = Mapping::load(&summary.mapping_path)?;
    for (_, entry) in mapping.iter() {
        assert!(matches!(entry, MappingEntry::Fields(f) if f.len() == 2));
    }

    let restored_path = temp_dir.path().join("restored.csv");
    let restored = deanonymize_file(
        &DeanonymizeRequest {
            anonymized: summary.anonymized_path.clone(),
            mapping: summary.mapping_path.clone(),
            key: summary.key_path.clone(),
            output: Some(restored_path.clone()),
        },
        &config,
    )?;

    info!("Detected columns: {:?}", restored.detected_columns);
    assert_eq!(restored.detected_columns, vec!["name", "email"]);
    assert!(restored.warnings.is_empty());
    assert_eq!(std::fs::read_to_string(&restored_path)?, PEOPLE_CSV);
    Ok(())
}

#[test]
fn test_file_roundtrip_separate_keys() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let config = Config::default();

    let request = anonymize(&temp_dir, &["name", "email"], Some(DedupPolicy::PerValue))?;
    let summary = anonymize_file(&request, &config)?;
    assert_eq!(summary.policy, DedupPolicy::PerValue);
    assert_eq!(summary.entries, 4);

    let stats = mapping_statistics(&summary.mapping_path)?;
    assert_eq!(stats.scalar_entries, 4);
    assert_eq!(stats.field_entries, 0);

    let restored_path = temp_dir.path().join("restored.csv");
    deanonymize_file(
        &DeanonymizeRequest {
            anonymized: summary.anonymized_path,
            mapping: summary.mapping_path,
            key: summary.key_path,
            output: Some(restored_path.clone()),
        },
        &config,
    )?;
    assert_eq!(std::fs::read_to_string(&restored_path)?, PEOPLE_CSV);
    Ok(())
}

#[test]
fn test_missing_column_writes_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let request = anonymize(&temp_dir, &["name", "phone"], None)?;

    let err = anonymize_file(&request, &Config::default()).unwrap_err();
    assert!(matches!(err, ConcealError::ColumnNotFound { ref column, .. } if column == "phone"));
    assert!(!request.output_dir.exists());
    Ok(())
}

#[test]
fn test_corrupt_key_aborts_before_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config::default();
    let summary = anonymize_file(&anonymize(&temp_dir, &["name"], None)?, &config)?;

    std::fs::write(&summary.key_path, b"definitely-not-a-key")?;
    let restored_path = temp_dir.path().join("restored.csv");

    let err = deanonymize_file(
        &DeanonymizeRequest {
            anonymized: summary.anonymized_path,
            mapping: summary.mapping_path,
            key: summary.key_path,
            output: Some(restored_path.clone()),
        },
        &config,
    )
    .unwrap_err();

    assert!(matches!(err, ConcealError::KeyFormat(_)));
    assert!(!restored_path.exists());
    Ok(())
}

#[test]
fn test_malformed_mapping_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config::default();
    let summary = anonymize_file(&anonymize(&temp_dir, &["name"], None)?, &config)?;

    std::fs::write(&summary.mapping_path, "[1, 2, 3]")?;
    let err = deanonymize_file(
        &DeanonymizeRequest {
            anonymized: summary.anonymized_path,
            mapping: summary.mapping_path,
            key: summary.key_path,
            output: Some(temp_dir.path().join("restored.csv")),
        },
        &config,
    )
    .unwrap_err();

    assert!(matches!(err, ConcealError::MappingFormat(_)));
    Ok(())
}

#[test]
fn test_unknown_identifier_in_file_is_tolerated() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let config = Config::default();
    let summary = anonymize_file(&anonymize(&temp_dir, &["name"], None)?, &config)?;

    let stray = "99999999-9999-4999-8999-999999999999";
    let mut contents = std::fs::read_to_string(&summary.anonymized_path)?;
    contents.push_str(&format!("{},z@x.com,Radiology\n", stray));
    std::fs::write(&summary.anonymized_path, contents)?;

    let restored_path = temp_dir.path().join("restored.csv");
    let result = deanonymize_file(
        &DeanonymizeRequest {
            anonymized: summary.anonymized_path,
            mapping: summary.mapping_path,
            key: summary.key_path,
            output: Some(restored_path.clone()),
        },
        &config,
    )?;

    assert_eq!(
        result.warnings,
        vec![Warning::MissingIdentifier {
            identifier: stray.to_string()
        }]
    );
    let restored = Table::read_csv(&restored_path)?;
    assert_eq!(restored.cell(0, "name"), Some("Alice"));
    assert_eq!(restored.cell(3, "name"), Some(stray));
    Ok(())
}

#[test]
fn test_rewrite_document_end_to_end() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let config = Config::default();
    let summary = anonymize_file(&anonymize(&temp_dir, &["name", "email"], None)?, &config)?;

    let anonymized = Table::read_csv(&summary.anonymized_path)?;
    let alice = anonymized.cell(0, "name").unwrap().to_string();
    let bob = anonymized.cell(1, "name").unwrap().to_string();
    let stray = "99999999-9999-4999-8999-999999999999";

    let document = write_input(
        temp_dir.path(),
        "letter.txt",
        &format!(
            "Referral for {}\nCopy to {} and {}.\nNo identifiers on this line.\n",
            alice, bob, stray
        ),
    );

    let result = rewrite_document(
        &RewriteRequest {
            document: document.clone(),
            mapping: summary.mapping_path,
            key: summary.key_path,
            reference_table: summary.anonymized_path,
            columns: None,
            output: None,
        },
        &config,
    )?;

    assert_eq!(result.output_path, temp_dir.path().join("letter_deanonymized.txt"));
    assert_eq!(result.identifiers_found, 2);
    assert_eq!(result.resolved, 2);
    assert_eq!(result.replacements, 2);
    assert_eq!(result.blocks_changed, 2);

    let rewritten = std::fs::read_to_string(&result.output_path)?;
    assert_eq!(
        rewritten,
        format!(
            "Referral for Alice\nCopy to Bob and {}.\nNo identifiers on this line.\n",
            stray
        )
    );
    Ok(())
}

#[test]
fn test_rewrite_prefers_explicit_column_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config::default();
    let summary = anonymize_file(&anonymize(&temp_dir, &["name", "email"], None)?, &config)?;

    // Reference table without the original column names forces the
    // column-set fallback.
    let anonymized = Table::read_csv(&summary.anonymized_path)?;
    let alice = anonymized.cell(0, "name").unwrap().to_string();
    let reference = write_input(temp_dir.path(), "reference.csv", &format!("ref\n{}\n", alice));
    let document = write_input(temp_dir.path(), "note.txt", &alice);

    let output = temp_dir.path().join("note_out.txt");
    let result = rewrite_document(
        &RewriteRequest {
            document,
            mapping: summary.mapping_path,
            key: summary.key_path,
            reference_table: reference,
            columns: Some(vec!["email".to_string(), "name".to_string()]),
            output: Some(output.clone()),
        },
        &config,
    )?;

    assert_eq!(result.resolved, 1);
    assert_eq!(std::fs::read_to_string(&output)?, "a@x.com");
    Ok(())
}
