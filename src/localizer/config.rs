//! Localizer configuration, loaded from YAML.
//!
//! ```yaml
//! overlap_range:
//!   min: 0.3
//!   max: 0.8
//! local_map_capacity: 5
//! backlog_warning: 10
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Overlap bounds used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OverlapRange {
    /// Below this the registration is reported as unreliable.
    pub min: f64,
    /// Below this the local map is no longer good enough and a keyframe
    /// should be added.
    pub max: f64,
}

impl Default for OverlapRange {
    fn default() -> Self {
        Self { min: 0.3, max: 0.8 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalizerConfig {
    pub overlap_range: OverlapRange,

    /// Initial window capacity, before the first hand-over from the manager.
    pub local_map_capacity: usize,

    /// Queue length above which producers are warned that the worker
    /// falls behind.
    pub backlog_warning: usize,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            overlap_range: OverlapRange::default(),
            local_map_capacity: 5,
            backlog_warning: 10,
        }
    }
}

impl LocalizerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: LocalizerConfig =
            serde_yaml::from_str(yaml).context("Failed to parse localizer YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: LocalizerConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse localizer config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let OverlapRange { min, max } = self.overlap_range;
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) {
            bail!("overlap_range bounds must lie in [0, 1], got [{}, {}]", min, max);
        }
        if min > max {
            bail!("overlap_range.min ({}) is above overlap_range.max ({})", min, max);
        }
        if self.local_map_capacity == 0 {
            bail!("local_map_capacity must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LocalizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = LocalizerConfig::from_yaml_str("backlog_warning: 3\n").unwrap();
        assert_eq!(config.backlog_warning, 3);
        assert_eq!(config.overlap_range, OverlapRange::default());
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(LocalizerConfig::from_yaml_str("overlap_range: {min: 0.9, max: 0.5}\n").is_err());
        assert!(LocalizerConfig::from_yaml_str("overlap_range: {min: 0.1, max: 1.5}\n").is_err());
        assert!(LocalizerConfig::from_yaml_str("local_map_capacity: 0\n").is_err());
        assert!(LocalizerConfig::from_yaml_str("overlap: 0.5\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "overlap_range:\n  min: 0.2\n  max: 0.6\nlocal_map_capacity: 3").unwrap();

        let config = LocalizerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.overlap_range, OverlapRange { min: 0.2, max: 0.6 });
        assert_eq!(config.local_map_capacity, 3);

        assert!(LocalizerConfig::from_yaml_file("/nonexistent/localizer.yaml").is_err());
    }
}
