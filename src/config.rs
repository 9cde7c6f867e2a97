//! Pipeline configuration loaded from TOML with per-field defaults.
//!
//! Both binaries start from [`PipelineConfig::default`], optionally replace it
//! with a TOML file, then apply command-line overrides. Missing sections and
//! missing keys fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::california::CaliforniaHousing;
use crate::dataset::split::SplitOptions;
use crate::ml::cart::TreeParams;

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Settings for `caltree-prepare`.
    pub prepare: PrepareConfig,
    /// Settings for `caltree-train`.
    pub train: TrainConfig,
}

impl PipelineConfig {
    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load `path` when given, otherwise return defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Dataset preparation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepareConfig {
    /// Number of training rows.
    pub train_size: usize,
    /// Number of test rows.
    pub test_size: usize,
    /// Seed for the stratified split.
    pub random_state: u64,
    /// Number of quantile bins used for stratification.
    pub bins: usize,
    /// Output directory for the CSV files.
    pub out_dir: PathBuf,
    /// Local `cal_housing.data` or `cal_housing.tgz` to read instead of the cache.
    pub source: Option<PathBuf>,
    /// Dataset cache directory.
    pub data_home: Option<PathBuf>,
    /// Fetch the archive when it is not cached yet.
    pub download_if_missing: bool,
    /// Override for the archive URL (HTTPS only).
    pub source_url: Option<String>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            train_size: 3000,
            test_size: 300,
            random_state: 42,
            bins: 10,
            out_dir: PathBuf::from("data"),
            source: None,
            data_home: None,
            download_if_missing: true,
            source_url: None,
        }
    }
}

impl PrepareConfig {
    /// Split options derived from this configuration.
    pub fn split_options(&self) -> SplitOptions {
        SplitOptions {
            train_size: self.train_size,
            test_size: self.test_size,
            random_state: self.random_state,
            bins: self.bins,
        }
    }

    /// California Housing source configured from these settings.
    pub fn california_source(&self) -> CaliforniaHousing {
        CaliforniaHousing {
            local_path: self.source.clone(),
            data_home: self.data_home.clone(),
            download_if_missing: self.download_if_missing,
            url: self.source_url.clone(),
        }
    }
}

/// Command-line values for [`PrepareConfig`]; `None` keeps the loaded value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareOverrides {
    pub train_size: Option<usize>,
    pub test_size: Option<usize>,
    pub random_state: Option<u64>,
    pub bins: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub data_home: Option<PathBuf>,
    /// Only ever disables downloads.
    pub offline: bool,
}

impl PrepareConfig {
    /// Layer command-line values over this configuration.
    pub fn apply_overrides(&mut self, overrides: PrepareOverrides) {
        if let Some(value) = overrides.train_size {
            self.train_size = value;
        }
        if let Some(value) = overrides.test_size {
            self.test_size = value;
        }
        if let Some(value) = overrides.random_state {
            self.random_state = value;
        }
        if let Some(value) = overrides.bins {
            self.bins = value;
        }
        if let Some(value) = overrides.out_dir {
            self.out_dir = value;
        }
        if overrides.source.is_some() {
            self.source = overrides.source;
        }
        if overrides.data_home.is_some() {
            self.data_home = overrides.data_home;
        }
        if overrides.offline {
            self.download_if_missing = false;
        }
    }
}

/// Tree training and export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Training CSV written by the preparer.
    pub train_csv: PathBuf,
    /// Optional held-out CSV used only for reporting.
    pub test_csv: Option<PathBuf>,
    /// Target column name.
    pub target: String,
    /// Maximum tree depth; zero or negative means unlimited.
    pub max_depth: i64,
    /// Minimum samples per leaf.
    pub min_samples_leaf: usize,
    /// Seed for the feature visiting order during fitting.
    pub random_state: u64,
    /// Output directory for `tree.json` and `meta.json`.
    pub out_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_csv: PathBuf::from("data/california_housing_train.csv"),
            test_csv: None,
            target: "MedHouseVal".to_string(),
            max_depth: 6,
            min_samples_leaf: 20,
            random_state: 42,
            out_dir: PathBuf::from("model"),
        }
    }
}

impl TrainConfig {
    /// Depth limit with the "non-positive means unlimited" convention applied.
    pub fn effective_max_depth(&self) -> Option<usize> {
        usize::try_from(self.max_depth).ok().filter(|depth| *depth > 0)
    }

    /// Tree hyperparameters derived from this configuration.
    pub fn tree_params(&self) -> TreeParams {
        TreeParams::new()
            .max_depth(self.effective_max_depth())
            .min_samples_leaf(self.min_samples_leaf)
            .random_state(self.random_state)
    }
}

/// Command-line values for [`TrainConfig`]; `None` keeps the loaded value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainOverrides {
    pub train_csv: Option<PathBuf>,
    pub test_csv: Option<PathBuf>,
    pub target: Option<String>,
    pub max_depth: Option<i64>,
    pub min_samples_leaf: Option<usize>,
    pub random_state: Option<u64>,
    pub out_dir: Option<PathBuf>,
}

impl TrainConfig {
    /// Layer command-line values over this configuration.
    pub fn apply_overrides(&mut self, overrides: TrainOverrides) {
        if let Some(value) = overrides.train_csv {
            self.train_csv = value;
        }
        if overrides.test_csv.is_some() {
            self.test_csv = overrides.test_csv;
        }
        if let Some(value) = overrides.target {
            self.target = value;
        }
        if let Some(value) = overrides.max_depth {
            self.max_depth = value;
        }
        if let Some(value) = overrides.min_samples_leaf {
            self.min_samples_leaf = value;
        }
        if let Some(value) = overrides.random_state {
            self.random_state = value;
        }
        if let Some(value) = overrides.out_dir {
            self.out_dir = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.prepare.train_size, 3000);
        assert_eq!(config.prepare.test_size, 300);
        assert_eq!(config.prepare.random_state, 42);
        assert_eq!(config.prepare.bins, 10);
        assert_eq!(config.prepare.out_dir, PathBuf::from("data"));
        assert_eq!(
            config.train.train_csv,
            PathBuf::from("data/california_housing_train.csv")
        );
        assert_eq!(config.train.target, "MedHouseVal");
        assert_eq!(config.train.max_depth, 6);
        assert_eq!(config.train.min_samples_leaf, 20);
        assert_eq!(config.train.out_dir, PathBuf::from("model"));
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [prepare]
            train_size = 500
            bins = 4

            [train]
            max_depth = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.prepare.train_size, 500);
        assert_eq!(config.prepare.test_size, 300);
        assert_eq!(config.prepare.bins, 4);
        assert_eq!(config.train.max_depth, 0);
        assert_eq!(config.train.min_samples_leaf, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_toml_str("[prepare]\ntrian_size = 5\n").unwrap_err();
        assert!(err.to_string().contains("trian_size"));
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[prepare").unwrap();
        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn non_positive_depth_means_unlimited() {
        let mut config = TrainConfig::default();
        assert_eq!(config.effective_max_depth(), Some(6));
        config.max_depth = 0;
        assert_eq!(config.effective_max_depth(), None);
        config.max_depth = -3;
        assert_eq!(config.effective_max_depth(), None);
    }

    #[test]
    fn flags_beat_file_values_which_beat_defaults() {
        let mut config = PipelineConfig::from_toml_str(
            r#"
            [prepare]
            train_size = 700
            test_size = 50
            data_home = "cache"
            "#,
        )
        .unwrap()
        .prepare;
        config.apply_overrides(PrepareOverrides {
            test_size: Some(60),
            offline: true,
            ..PrepareOverrides::default()
        });
        assert_eq!(config.train_size, 700);
        assert_eq!(config.test_size, 60);
        assert_eq!(config.bins, 10);
        assert_eq!(config.data_home, Some(PathBuf::from("cache")));
        assert!(!config.download_if_missing);
    }

    #[test]
    fn empty_overrides_leave_config_alone() {
        let loaded = PipelineConfig::from_toml_str(
            r#"
            [train]
            max_depth = 3
            target = "Price"
            "#,
        )
        .unwrap()
        .train;
        let mut config = loaded.clone();
        config.apply_overrides(TrainOverrides::default());
        assert_eq!(config, loaded);

        config.apply_overrides(TrainOverrides {
            max_depth: Some(-1),
            test_csv: Some(PathBuf::from("data/test.csv")),
            ..TrainOverrides::default()
        });
        assert_eq!(config.effective_max_depth(), None);
        assert_eq!(config.target, "Price");
        assert_eq!(config.test_csv, Some(PathBuf::from("data/test.csv")));
    }
}
