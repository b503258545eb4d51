//! Tabular Conceal command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabular_conceal_core::{
    AnonymizeRequest, Config, DeanonymizeRequest, DedupPolicy, RewriteRequest,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, global = true, default_value = "info", help = "Log level (error, warn, info, debug, trace)")]
    pub log_level: String,

    #[arg(long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace sensitive columns with random identifiers
    Anonymize {
        #[arg(help = "CSV table to anonymize")]
        table: PathBuf,

        #[arg(required = true, num_args = 1.., help = "Columns to anonymize")]
        columns: Vec<String>,

        #[arg(short, long, default_value = ".", help = "Directory for the anonymized table, mapping and key")]
        output: PathBuf,

        #[arg(long, conflicts_with = "composite", help = "Issue one identifier per distinct value")]
        separate_keys: bool,

        #[arg(long, help = "Issue one identifier per distinct combination of values")]
        composite: bool,
    },

    /// Restore original values in an anonymized table
    Deanonymize {
        #[arg(help = "Anonymized CSV table")]
        anonymized: PathBuf,

        #[arg(help = "Mapping file (JSON)")]
        mapping: PathBuf,

        #[arg(help = "Key file")]
        key: PathBuf,

        #[arg(short, long, help = "Output CSV path")]
        output: Option<PathBuf>,
    },

    /// Replace identifiers found in a text document with original values
    Rewrite {
        #[arg(help = "Text document to rewrite")]
        document: PathBuf,

        #[arg(short, long, help = "Mapping file (JSON) [default: anonymize.mapping_file]")]
        mapping: Option<PathBuf>,

        #[arg(short = 'c', long = "csv", help = "Anonymized reference table [default: anonymize.anonymized_file]")]
        reference_table: Option<PathBuf>,

        #[arg(short, long, help = "Key file [default: anonymize.key_file]")]
        key: Option<PathBuf>,

        #[arg(long, num_args = 1.., help = "Preferred field order when resolving identifiers")]
        columns: Option<Vec<String>>,

        #[arg(short, long, help = "Output document path")]
        output: Option<PathBuf>,
    },

    /// Summarize a mapping file
    Stats {
        #[arg(help = "Mapping file (JSON)")]
        mapping: PathBuf,
    },
}

impl Command {
    pub fn policy_override(&self) -> Option<DedupPolicy> {
        match self {
            Command::Anonymize {
                separate_keys: true, ..
            } => Some(DedupPolicy::PerValue),
            Command::Anonymize { composite: true, .. } => Some(DedupPolicy::Composite),
            _ => None,
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(config_path) => {
            info!("Loading configuration from: {}", config_path.display());
            Config::from_file(config_path)?
        }
        None => match Config::get_default_config_path() {
            Ok(default_path) if default_path.exists() => {
                info!("Loading configuration from default location: {}", default_path.display());
                Config::from_file(&default_path)?
            }
            Ok(default_path) => {
                let config = Config::default();
                match config.to_file(&default_path) {
                    Ok(()) => info!("Created default configuration at: {}", default_path.display()),
                    Err(e) => warn!("Could not write default configuration: {}", e),
                }
                config
            }
            Err(_) => {
                info!("Using default configuration (could not determine config directory)");
                Config::default()
            }
        },
    };

    config.validate()?;
    Ok(config)
}

fn run(command: Command, config: &Config) -> Result<()> {
    let policy = command.policy_override();

    match command {
        Command::Anonymize {
            table,
            columns,
            output,
            ..
        } => {
            let summary = tabular_conceal_core::anonymize_file(
                &AnonymizeRequest {
                    table,
                    columns,
                    output_dir: output,
                    policy,
                },
                config,
            )?;
            println!(
                "Anonymized {} rows ({} identifiers, {} policy)",
                summary.rows, summary.entries, summary.policy
            );
            println!("  table:   {}", summary.anonymized_path.display());
            println!("  mapping: {}", summary.mapping_path.display());
            println!("  key:     {}", summary.key_path.display());
        }
        Command::Deanonymize {
            anonymized,
            mapping,
            key,
            output,
        } => {
            let summary = tabular_conceal_core::deanonymize_file(
                &DeanonymizeRequest {
                    anonymized,
                    mapping,
                    key,
                    output,
                },
                config,
            )?;
            println!(
                "Restored columns [{}] into {}",
                summary.detected_columns.join(", "),
                summary.output_path.display()
            );
            if !summary.warnings.is_empty() {
                println!("{} cells left unchanged", summary.warnings.len());
            }
        }
        Command::Rewrite {
            document,
            mapping,
            reference_table,
            key,
            columns,
            output,
        } => {
            let summary = tabular_conceal_core::rewrite_document(
                &RewriteRequest {
                    document,
                    mapping: mapping.unwrap_or_else(|| config.anonymize.mapping_file.clone().into()),
                    key: key.unwrap_or_else(|| config.anonymize.key_file.clone().into()),
                    reference_table: reference_table
                        .unwrap_or_else(|| config.anonymize.anonymized_file.clone().into()),
                    columns,
                    output,
                },
                config,
            )?;
            println!(
                "Resolved {} of {} identifiers; {} replacements in {} blocks",
                summary.resolved,
                summary.identifiers_found,
                summary.replacements,
                summary.blocks_changed
            );
            if !summary.warnings.is_empty() {
                println!("{} warnings during resolution", summary.warnings.len());
            }
            if !summary.unresolved.is_empty() {
                println!("Unresolved: {}", summary.unresolved.join(", "));
            }
            println!("Output saved to {}", summary.output_path.display());
        }
        Command::Stats { mapping } => {
            let stats = tabular_conceal_core::mapping_statistics(&mapping)?;
            println!("Total entries:  {}", stats.total_entries);
            println!("Scalar entries: {}", stats.scalar_entries);
            println!("Field entries:  {}", stats.field_entries);

            let mut by_field: Vec<_> = stats.entries_by_field.iter().collect();
            by_field.sort();
            for (field, count) in by_field {
                println!("  {}: {}", field, count);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse::<tracing::Level>()
        .unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', defaulting to 'info'", args.log_level);
            tracing::Level::INFO
        });

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref())?;
    info!("Configuration validated successfully");

    run(args.command, &config)
}
