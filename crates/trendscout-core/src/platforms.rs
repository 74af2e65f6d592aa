//! Platform roster loaded from `config/platforms.yaml`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Platform};

/// Hard cap on records read from one platform per collection.
pub const MAX_ITEMS_PER_PLATFORM: usize = 30;

pub const DEFAULT_ITEMS_PER_PLATFORM: usize = 20;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub tag: Platform,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Keywords, hashtags or subreddits, collected in this order.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Identifier of the job-based collector for this platform, if any.
    #[serde(default)]
    pub collector_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Extra scrape parameters merged into every trigger body.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

impl PlatformConfig {
    /// Builds an enabled entry with no keywords or collector.
    #[must_use]
    pub fn new(tag: Platform) -> Self {
        Self {
            tag,
            enabled: true,
            keywords: Vec::new(),
            collector_id: None,
            limit: None,
            params: None,
        }
    }

    /// Number of records to read, clamped to `1..=MAX_ITEMS_PER_PLATFORM`.
    #[must_use]
    pub fn item_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_ITEMS_PER_PLATFORM)
            .clamp(1, MAX_ITEMS_PER_PLATFORM)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformsFile {
    pub platforms: Vec<PlatformConfig>,
}

impl PlatformsFile {
    #[must_use]
    pub fn get(&self, platform: &Platform) -> Option<&PlatformConfig> {
        self.platforms.iter().find(|p| &p.tag == platform)
    }

    /// Tags of every enabled entry, in file order.
    #[must_use]
    pub fn enabled_tags(&self) -> Vec<Platform> {
        self.platforms
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.tag.clone())
            .collect()
    }
}

/// Load and validate the platform roster from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_platforms(path: &Path) -> Result<PlatformsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlatformsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_platforms(&content)
}

/// Parse and validate a platform roster from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_platforms(content: &str) -> Result<PlatformsFile, ConfigError> {
    let file: PlatformsFile = serde_yaml::from_str(content)?;
    validate_platforms(&file)?;
    Ok(file)
}

fn validate_platforms(file: &PlatformsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in &file.platforms {
        if !seen.insert(entry.tag.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform tag: '{}'",
                entry.tag
            )));
        }

        if entry
            .collector_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "platform '{}' has an empty collector_id",
                entry.tag
            )));
        }

        if let Some(params) = &entry.params {
            if !params.is_object() {
                return Err(ConfigError::Validation(format!(
                    "platform '{}' params must be a mapping",
                    entry.tag
                )));
            }
        }

        if entry.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "platform '{}' has a blank keyword",
                entry.tag
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "platforms_test.rs"]
mod tests;
