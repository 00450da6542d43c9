//! Page copy constants and the TOML-backed type configuration layer.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::Deserialize;

use crate::repo::TypeConfigLookup;
use crate::spec::SpecTypeConfig;

/// Navigation position property name.
pub const C_PROPERTY_NAV_POS: &str = "NavPos";
/// Locale property name, inherited from ancestor folders.
pub const C_PROPERTY_LOCALE: &str = "locale";
/// Locale used when no folder on the path sets one.
pub const C_LOCALE_DEFAULT: &str = "en";
/// Distance between the highest sibling navigation position and a new copy.
pub const N_NAV_POS_STEP: f64 = 10.0;
/// Placeholder replaced by the name generator.
pub const C_NUMBER_PLACEHOLDER: &str = "%(number)";
/// Zero-padded width of generated numbers.
pub const N_NUMBER_DIGITS: usize = 4;
/// Type name of container pages.
pub const C_TYPE_CONTAINER_PAGE: &str = "containerpage";
/// Type name of model groups, never copied as elements.
pub const C_TYPE_MODEL_GROUP: &str = "modelgroup";
/// Scope applied to entries that do not declare one.
pub const C_SCOPE_ANY: &str = "/**";

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read configuration {path}: {message}")]
    Read {
        /// Configuration file path.
        path: String,
        /// Underlying IO error text.
        message: String,
    },
    /// TOML syntax or schema error.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// Scope is not a valid glob.
    #[error("Invalid scope pattern `{scope}`: {message}")]
    InvalidScope {
        /// Offending scope pattern.
        scope: String,
        /// Glob compiler message.
        message: String,
    },
    /// Name pattern lacks exactly one placeholder or contains a separator.
    #[error("Invalid name pattern `{0}`: expected one `%(number)` and no `/`")]
    InvalidNamePattern(String),
}

/// One `[[types]]` entry as written in the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SpecTypeConfigEntry {
    /// Resource type name.
    pub name_type: String,
    /// Glob over target page root paths.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Copy elements of this type when duplicating pages.
    #[serde(default)]
    pub if_copy_in_models: bool,
    /// Folder receiving new element copies.
    #[serde(default)]
    pub path_folder_content: Option<String>,
    /// File name pattern for new element copies.
    #[serde(default)]
    pub name_pattern: Option<String>,
}

fn default_scope() -> String {
    C_SCOPE_ANY.to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfTypeConfigs {
    #[serde(default)]
    types: Vec<SpecTypeConfigEntry>,
}

/// Type configurations scoped by target location.
///
/// The most specific matching scope (longest pattern) wins; among equally
/// long scopes the first declared entry wins.
#[derive(Debug, Clone, Default)]
pub struct ConfTypeConfigs {
    l_entries: Vec<(GlobMatcher, SpecTypeConfigEntry)>,
}

impl ConfTypeConfigs {
    /// Parse a TOML document.
    pub fn from_toml_str(txt: &str) -> Result<Self, ConfigError> {
        let raw: RawConfTypeConfigs = toml::from_str(txt)?;
        let mut conf = Self::default();
        for entry in raw.types {
            conf.push(entry)?;
        }
        Ok(conf)
    }

    /// Read and parse a TOML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&txt)
    }

    /// Validate and append one entry.
    pub fn push(&mut self, entry: SpecTypeConfigEntry) -> Result<(), ConfigError> {
        let matcher = GlobBuilder::new(&entry.scope)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidScope {
                scope: entry.scope.clone(),
                message: e.to_string(),
            })?
            .compile_matcher();
        if let Some(pattern) = &entry.name_pattern {
            validate_name_pattern(pattern)?;
        }
        self.l_entries.push((matcher, entry));
        Ok(())
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.l_entries.len()
    }

    /// Whether no entries are configured.
    pub fn is_empty(&self) -> bool {
        self.l_entries.is_empty()
    }
}

impl TypeConfigLookup for ConfTypeConfigs {
    fn type_config(&self, path_target: &str, name_type: &str) -> Option<SpecTypeConfig> {
        let mut best: Option<&SpecTypeConfigEntry> = None;
        for (matcher, entry) in &self.l_entries {
            if entry.name_type != name_type || !matcher.is_match(path_target) {
                continue;
            }
            if best.is_none_or(|b| entry.scope.len() > b.scope.len()) {
                best = Some(entry);
            }
        }
        best.map(|entry| SpecTypeConfig {
            name_type: entry.name_type.clone(),
            if_copy_in_models: entry.if_copy_in_models,
            path_folder_content: entry.path_folder_content.clone(),
            name_pattern: entry
                .name_pattern
                .clone()
                .unwrap_or_else(|| format!("{}_{C_NUMBER_PLACEHOLDER}.xml", entry.name_type)),
        })
    }
}

fn validate_name_pattern(pattern: &str) -> Result<(), ConfigError> {
    let re_placeholder = Regex::new(&regex::escape(C_NUMBER_PLACEHOLDER))
        .map_err(|_| ConfigError::InvalidNamePattern(pattern.to_string()))?;
    if re_placeholder.find_iter(pattern).count() != 1 || pattern.contains('/') {
        return Err(ConfigError::InvalidNamePattern(pattern.to_string()));
    }
    Ok(())
}
