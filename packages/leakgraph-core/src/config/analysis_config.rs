//! Analysis configuration
//!
//! Tunables for indexing, hydration and growth detection. Algorithms are not
//! configurable here: the path search and dominator computation are exact.

use super::error::{ConfigError, ConfigResult};
use super::io::ConfigExportV1;
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_OBJECT_CACHE_SIZE: usize = 1_000_000;
const MIN_STREAM_BUFFER_SIZE: usize = 4 * 1024;
const MAX_STREAM_BUFFER_SIZE: usize = 64 * 1024 * 1024;
const MIN_GROWTH_SNAPSHOTS: usize = 2;
const MAX_GROWTH_SNAPSHOTS: usize = 100;

/// Heap analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Compute the dominator tree and attach retained sizes to leak traces
    pub compute_retained_size: bool,

    /// Hydrated objects kept in the LRU cache (0 disables caching)
    pub object_cache_size: usize,

    /// Buffer used by the streaming indexer, in bytes
    pub stream_buffer_size: usize,

    /// Upper bound on snapshots consumed by the growth detector
    pub max_growth_snapshots: usize,

    /// Keep every STRING record in memory instead of only class and field names
    #[serde(default)]
    pub retain_all_strings: bool,
}

impl AnalysisConfig {
    /// Create configuration from preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                compute_retained_size: false,
                object_cache_size: 0,
                stream_buffer_size: 64 * 1024,
                max_growth_snapshots: 5,
                retain_all_strings: false,
            },
            Preset::Balanced => Self {
                compute_retained_size: true,
                object_cache_size: 4096,
                stream_buffer_size: 256 * 1024,
                max_growth_snapshots: 10,
                retain_all_strings: false,
            },
            Preset::Thorough => Self {
                compute_retained_size: true,
                object_cache_size: 65536,
                stream_buffer_size: 1024 * 1024,
                max_growth_snapshots: 25,
                retain_all_strings: false,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.object_cache_size > MAX_OBJECT_CACHE_SIZE {
            return Err(ConfigError::range_with_hint(
                "object_cache_size",
                self.object_cache_size,
                0,
                MAX_OBJECT_CACHE_SIZE,
                "Cache holds hydrated objects, keep it bounded",
            ));
        }

        if self.stream_buffer_size < MIN_STREAM_BUFFER_SIZE
            || self.stream_buffer_size > MAX_STREAM_BUFFER_SIZE
        {
            return Err(ConfigError::range_with_hint(
                "stream_buffer_size",
                self.stream_buffer_size,
                MIN_STREAM_BUFFER_SIZE,
                MAX_STREAM_BUFFER_SIZE,
                "Stream buffer must be between 4 KiB and 64 MiB",
            ));
        }

        if self.max_growth_snapshots < MIN_GROWTH_SNAPSHOTS
            || self.max_growth_snapshots > MAX_GROWTH_SNAPSHOTS
        {
            return Err(ConfigError::range_with_hint(
                "max_growth_snapshots",
                self.max_growth_snapshots,
                MIN_GROWTH_SNAPSHOTS,
                MAX_GROWTH_SNAPSHOTS,
                "Growth needs at least two snapshots to diff",
            ));
        }

        Ok(())
    }

    /// Builder: Set compute_retained_size
    pub fn compute_retained_size(mut self, v: bool) -> Self {
        self.compute_retained_size = v;
        self
    }

    /// Builder: Set object_cache_size
    pub fn object_cache_size(mut self, v: usize) -> Self {
        self.object_cache_size = v;
        self
    }

    /// Builder: Set stream_buffer_size
    pub fn stream_buffer_size(mut self, v: usize) -> Self {
        self.stream_buffer_size = v;
        self
    }

    /// Builder: Set max_growth_snapshots
    pub fn max_growth_snapshots(mut self, v: usize) -> Self {
        self.max_growth_snapshots = v;
        self
    }

    /// Builder: Set retain_all_strings
    pub fn retain_all_strings(mut self, v: bool) -> Self {
        self.retain_all_strings = v;
        self
    }

    /// Load a validated configuration from a YAML v1 file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a validated configuration from YAML v1 text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        if export.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: vec![1],
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::from_preset(preset);
        if let Some(overrides) = export.overrides {
            overrides.apply(&mut config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Export as YAML v1, every field written as an override of `preset`
    pub fn to_yaml(&self, preset: Preset) -> ConfigResult<String> {
        let export = ConfigExportV1::from_config(self, preset);
        Ok(serde_yaml::to_string(&export)?)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_presets_validate() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
            assert!(AnalysisConfig::from_preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_fast_preset_skips_retained_size() {
        let config = AnalysisConfig::from_preset(Preset::Fast);
        assert!(!config.compute_retained_size);
        assert_eq!(config.object_cache_size, 0);
    }

    #[test]
    fn test_range_validation() {
        let config = AnalysisConfig::default().stream_buffer_size(16);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Range { ref field, .. } if field == "stream_buffer_size"));

        let config = AnalysisConfig::default().max_growth_snapshots(1);
        assert!(config.validate().is_err());

        let config = AnalysisConfig::default().object_cache_size(MAX_OBJECT_CACHE_SIZE + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_loading() {
        let yaml_content = r#"
version: 1
preset: fast
overrides:
  compute_retained_size: true
  max_growth_snapshots: 7
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = AnalysisConfig::from_yaml(temp_file.path()).unwrap();
        assert!(config.compute_retained_size);
        assert_eq!(config.max_growth_snapshots, 7);
        assert_eq!(config.object_cache_size, 0);
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = AnalysisConfig::from_yaml_str("version: 2\npreset: fast\n");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn test_yaml_unknown_preset() {
        let result = AnalysisConfig::from_yaml_str("version: 1\npreset: turbo\n");
        assert!(matches!(result.unwrap_err(), ConfigError::UnknownPreset(_)));
    }

    #[test]
    fn test_yaml_invalid_override_rejected() {
        let yaml = "version: 1\npreset: balanced\noverrides:\n  stream_buffer_size: 1\n";
        assert!(AnalysisConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = AnalysisConfig::from_preset(Preset::Thorough).max_growth_snapshots(42);
        let yaml = config.to_yaml(Preset::Thorough).unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("preset: thorough"));

        let recovered = AnalysisConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(recovered, config);
    }
}
