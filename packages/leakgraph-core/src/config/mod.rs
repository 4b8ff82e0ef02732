//! Analysis configuration
//!
//! Two tiers, following the rest of the workspace:
//! - Level 1: Preset - one-liner (`AnalysisConfig::from_preset(Preset::Fast)`)
//! - Level 2: YAML v1 file with per-field overrides
//!
//! # Examples
//!
//! ```rust,ignore
//! use leakgraph_core::config::{AnalysisConfig, Preset};
//!
//! let config = AnalysisConfig::from_preset(Preset::Balanced).object_cache_size(0);
//! config.validate()?;
//!
//! let config = AnalysisConfig::from_yaml("leakgraph.yaml")?;
//! ```

pub mod analysis_config;
pub mod error;
pub mod io;
pub mod preset;

// Re-exports
pub use analysis_config::AnalysisConfig;
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides};
pub use preset::Preset;
