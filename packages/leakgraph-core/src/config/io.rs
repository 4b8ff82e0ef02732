//! Configuration I/O (YAML schema)
//!
//! Defines YAML schema types. Loading and validation live in analysis_config.rs.

use super::analysis_config::AnalysisConfig;
use super::preset::Preset;
use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Configuration overrides, every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_retained_size: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_cache_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_buffer_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_growth_snapshots: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_all_strings: Option<bool>,
}

impl ConfigOverrides {
    pub(crate) fn apply(self, config: &mut AnalysisConfig) {
        if let Some(v) = self.compute_retained_size {
            config.compute_retained_size = v;
        }
        if let Some(v) = self.object_cache_size {
            config.object_cache_size = v;
        }
        if let Some(v) = self.stream_buffer_size {
            config.stream_buffer_size = v;
        }
        if let Some(v) = self.max_growth_snapshots {
            config.max_growth_snapshots = v;
        }
        if let Some(v) = self.retain_all_strings {
            config.retain_all_strings = v;
        }
    }
}

impl ConfigExportV1 {
    pub(crate) fn from_config(config: &AnalysisConfig, preset: Preset) -> Self {
        Self {
            version: 1,
            preset: preset.as_str().to_string(),
            overrides: Some(ConfigOverrides {
                compute_retained_size: Some(config.compute_retained_size),
                object_cache_size: Some(config.object_cache_size),
                stream_buffer_size: Some(config.stream_buffer_size),
                max_growth_snapshots: Some(config.max_growth_snapshots),
                retain_all_strings: Some(config.retain_all_strings),
            }),
        }
    }
}
