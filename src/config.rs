//! Engine configuration, loaded from TOML
//!
//! All thresholds are defaults, not normative limits. Every field may be
//! overridden and every omitted field keeps its default.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::optimize::OptimizationPreset;
use crate::validation::ValidationPreset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// ViewBox dimension above which a warning is raised
    pub very_large_view_box: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,

    pub performance_element_limit: usize,
    pub performance_depth_limit: usize,
    /// Estimated serialized size in bytes
    pub performance_size_limit: usize,
    pub performance_element_penalty: u32,
    pub performance_depth_penalty: u32,
    pub performance_size_penalty: u32,

    pub missing_title_penalty: u32,
    pub missing_description_penalty: u32,
    pub missing_aria_penalty: u32,
    /// Deducted once per text element below `min_font_size`
    pub small_text_penalty: u32,
    pub min_font_size: f64,
    /// Font size assumed for text without an explicit size
    pub default_font_size: f64,

    /// Path data longer than this gets a simplification suggestion
    pub long_path_data: usize,

    /// Deepest nesting any pass will walk. Deeper documents are rejected up front.
    pub max_traversal_depth: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            very_large_view_box: 100_000.0,
            min_aspect_ratio: 0.01,
            max_aspect_ratio: 100.0,
            performance_element_limit: 1000,
            performance_depth_limit: 10,
            performance_size_limit: 1_000_000,
            performance_element_penalty: 30,
            performance_depth_penalty: 15,
            performance_size_penalty: 25,
            missing_title_penalty: 20,
            missing_description_penalty: 15,
            missing_aria_penalty: 10,
            small_text_penalty: 5,
            min_font_size: 12.0,
            default_font_size: 16.0,
            long_path_data: 10_000,
            max_traversal_depth: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    /// Preset used when a request asks for validation without naming one
    pub validation: ValidationPreset,
    /// Preset used when a request passes `optimize: true`
    pub optimization: OptimizationPreset,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading engine configuration");

        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml_str(&content)?;
        debug!(config:?; "Loaded engine configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let t = Thresholds::default();
        assert_eq!(t.very_large_view_box, 100_000.0);
        assert_eq!(t.performance_element_limit, 1000);
        assert_eq!(t.performance_depth_limit, 10);
        assert_eq!(
            (t.missing_title_penalty, t.missing_description_penalty, t.missing_aria_penalty, t.small_text_penalty),
            (20, 15, 10, 5)
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
validation = "strict"
optimization = "aggressive"

[thresholds]
min_font_size = 10.0
"#,
        )
        .unwrap();
        assert_eq!(config.validation, ValidationPreset::Strict);
        assert_eq!(config.optimization, OptimizationPreset::Aggressive);
        assert_eq!(config.thresholds.min_font_size, 10.0);
        assert_eq!(config.thresholds.missing_title_penalty, 20);
    }

    #[test]
    fn test_unknown_preset_is_parse_error() {
        let err = EngineConfig::from_toml_str(r#"validation = "paranoid""#).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "optimization = \"conservative\"").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.optimization, OptimizationPreset::Conservative);

        let missing = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(missing, ConfigurationError::Unreadable { .. }));
    }
}
