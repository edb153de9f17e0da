use std::path::{Path, PathBuf};

use serde::de::Error as SerdeDeError;

use crate::app_dirs;

use super::{ConfigError, PipelineConfig};

/// Default filename of the pipeline configuration inside the app directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration for a stage run.
///
/// An explicit path must exist. Without one, `config.toml` in the app directory is used when
/// present and defaults otherwise. Returns the config and the file it came from, if any.
pub fn resolve(explicit: Option<&Path>) -> Result<(PipelineConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        let config = load_from_path(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }
    let path = app_dirs::config_file_path()?;
    if path.is_file() {
        let config = load_from_path(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((PipelineConfig::default(), None))
    }
}

/// Load and normalize a TOML config file. Missing sections and fields take defaults.
pub fn load_from_path(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source: SerdeDeError::custom(source),
    })?;
    toml::from_str::<PipelineConfig>(&text)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(PipelineConfig::normalized)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[train]\nepochs = 3\nseed = 7\n\n[report]\noutput_dir = \"plots\"\n",
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.train.epochs, 3);
        assert_eq!(config.train.seed, 7);
        assert_eq!(config.train.input_width, 42);
        assert_eq!(config.train.batch_size, 32);
        assert_eq!(config.report.output_dir, PathBuf::from("plots"));
        assert_eq!(config.report.report_file_name, "summary_report.txt");
        assert_eq!(
            config.merge.output_path(),
            PathBuf::from("shared_results").join("combined_gesture_samples.json")
        );
    }

    #[test]
    fn default_trainer_input_is_the_merger_output() {
        let config = PipelineConfig::default();
        assert_eq!(config.train.samples_path, config.merge.output_path());

        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[merge]\nsource_dir = \"sessions\"\n").unwrap();
        let config = load_from_path(&path).unwrap();
        assert_eq!(config.train.samples_path, config.merge.output_path());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[train]\ndropout = 1.5\nbatch_size = 0\ntest_fraction = -0.3\nlearning_rate = 0.0\n",
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.train.dropout, 0.9);
        assert_eq!(config.train.batch_size, 1);
        assert_eq!(config.train.test_fraction, 0.0);
        assert_eq!(config.train.learning_rate, 0.001);
    }

    #[test]
    fn saved_config_loads_back_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = PipelineConfig::default();
        config.merge.source_dir = PathBuf::from("sessions");
        config.train.hidden_units = 16;

        save_to_path(&config, &path).unwrap();
        assert_eq!(load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_reports_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[train\nepochs = ").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = resolve(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
