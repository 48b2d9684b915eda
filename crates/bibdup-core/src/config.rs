//! Detector configuration
//!
//! Controls which identity signals are compared and how matches are grouped.
//! Loaded from TOML or JSON; every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How overlapping matches are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingPolicy {
    /// Entries linked through any chain of shared keys or DOIs form one group
    #[default]
    Transitive,
    /// Every shared key and every shared DOI is its own group; an entry may
    /// appear in two groups
    PerSignal,
}

impl GroupingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transitive => "transitive",
            Self::PerSignal => "per-signal",
        }
    }
}

impl fmt::Display for GroupingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transitive" => Ok(Self::Transitive),
            "per-signal" | "per_signal" => Ok(Self::PerSignal),
            other => Err(ConfigError::UnknownGrouping(other.to_string())),
        }
    }
}

/// Duplicate detector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Entries with the same cite key are duplicates
    pub match_keys: bool,
    /// Entries declaring the same DOI are duplicates
    pub match_dois: bool,
    /// Compare DOIs after stripping resolver prefixes and lowercasing.
    /// Off means DOIs must match exactly as written.
    pub normalize_dois: bool,
    pub grouping: GroupingPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            match_keys: true,
            match_dois: true,
            normalize_dois: false,
            grouping: GroupingPolicy::Transitive,
        }
    }
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_keys && !self.match_dois {
            return Err(ConfigError::NoSignals);
        }
        Ok(())
    }
}

/// Configuration loading or validation error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one of match_keys and match_dois must be enabled")]
    NoSignals,

    #[error("unknown grouping policy `{0}` (expected `transitive` or `per-signal`)")]
    UnknownGrouping(String),

    #[error("malformed TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("could not serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
