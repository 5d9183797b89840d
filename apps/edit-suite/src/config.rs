use anyhow::{Context, Result};
use edit_harness::{ComparisonCriteria, FailurePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub comparison: ComparisonCriteria,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Where logged images are written.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Overrides each case's own policy when set.
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub combinations: Option<PathBuf>,
    #[serde(default)]
    pub masters_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: None,
            timeout_secs: default_timeout_secs(),
            failure_policy: None,
            combinations: None,
            masters_dir: None,
        }
    }
}

impl SuiteConfig {
    /// Load from `path`, or from the default location when it exists.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "edit-suite")
            .map(|p| p.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SuiteConfig = toml::from_str(
            r#"
[run]
failure_policy = "collect-all"

[comparison]
max_error_proportion = 0.05
"#,
        )
        .unwrap();

        assert_eq!(config.run.timeout_secs, 60);
        assert_eq!(config.run.failure_policy, Some(FailurePolicy::CollectAll));
        assert_eq!(config.comparison.max_error_proportion, 0.05);
        assert_eq!(
            config.comparison.max_color_distance,
            ComparisonCriteria::default().max_color_distance
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SuiteConfig::default();
        config.run.timeout_secs = 5;
        config.run.artifacts_dir = Some(PathBuf::from("out"));
        config.save(&path).unwrap();

        let loaded = SuiteConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.run.timeout_secs, 5);
        assert_eq!(loaded.run.artifacts_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SuiteConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
