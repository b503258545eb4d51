//! Configuration management for tabular-conceal

use crate::allocator::DedupPolicy;
use crate::deanonymize::ColumnDetection;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub anonymize: AnonymizeConfig,
    #[serde(default)]
    pub deanonymize: DeanonymizeConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyChoice {
    #[default]
    Auto,
    Composite,
    PerValue,
}

impl PolicyChoice {
    pub fn as_policy(self) -> Option<DedupPolicy> {
        match self {
            PolicyChoice::Auto => None,
            PolicyChoice::Composite => Some(DedupPolicy::Composite),
            PolicyChoice::PerValue => Some(DedupPolicy::PerValue),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizeConfig {
    pub policy: PolicyChoice,
    pub anonymized_file: String,
    pub mapping_file: String,
    pub key_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeanonymizeConfig {
    pub restored_file: String,
    pub detection: ColumnDetection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub output_suffix: String,
}

impl Default for AnonymizeConfig {
    fn default() -> Self {
        Self {
            policy: PolicyChoice::Auto,
            anonymized_file: "anonymized.csv".to_string(),
            mapping_file: "mapping.json".to_string(),
            key_file: "key.key".to_string(),
        }
    }
}

impl Default for DeanonymizeConfig {
    fn default() -> Self {
        Self {
            restored_file: "restored.csv".to_string(),
            detection: ColumnDetection::AllPresent,
        }
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            output_suffix: "_deanonymized".to_string(),
        }
    }
}

impl Config {
    pub fn get_app_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "tabular-conceal", "tabular-conceal")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine application directories"))
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn get_default_config_path() -> Result<PathBuf> {
        let project_dirs = Self::get_app_dirs()?;
        let config_dir = project_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.join("tabular-conceal.toml"))
    }

    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            ("anonymize.anonymized_file", &self.anonymize.anonymized_file),
            ("anonymize.mapping_file", &self.anonymize.mapping_file),
            ("anonymize.key_file", &self.anonymize.key_file),
            ("deanonymize.restored_file", &self.deanonymize.restored_file),
        ];
        for (setting, value) in names {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("'{}' must not be empty", setting));
            }
        }

        if let ColumnDetection::MinFraction(fraction) = self.deanonymize.detection {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(anyhow::anyhow!(
                    "Detection fraction must be in (0.0, 1.0], got {}",
                    fraction
                ));
            }
        }

        if self.rewrite.output_suffix.is_empty() {
            return Err(anyhow::anyhow!("'rewrite.output_suffix' must not be empty"));
        }

        Ok(())
    }
}
