//! Configuration loading functionality.
//!
//! This module provides the [`ConfigStore`] type for reading the YAML settings
//! file and persisting single-option updates back to it.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

use super::types::{SettingKey, Settings, parse_similarity_ratio};

/// Loads, holds and updates the engine settings.
///
/// The store keeps the raw YAML mapping next to the typed [`Settings`] so that
/// keys it does not know about survive an update.
///
/// # File Format
///
/// ```text
/// info_path: /srv/salon/zp_file/Расчет ЗП.xlsx
/// files_path: /srv/salon/files
/// files_new_path: /srv/salon/files_new
/// password: "1234"
/// similarity_ratio: 0.8
/// ```
///
/// Every key is optional; missing keys fall back to defaults relative to the
/// working directory.
///
/// # Example
///
/// ```no_run
/// use commission_engine::config::{ConfigStore, SettingKey};
///
/// let mut store = ConfigStore::load("config.yaml")?;
/// store.update(SettingKey::SimilarityRatio, "0.85")?;
/// assert_eq!(store.settings().similarity_ratio, 0.85);
/// # Ok::<(), commission_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    params: Mapping,
    settings: Settings,
}

impl ConfigStore {
    /// Loads settings from `path`, resolving defaults against the working
    /// directory.
    ///
    /// A missing file is not an error: the store starts from defaults and
    /// creates the file on the first update.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| EngineError::io(Path::new("."), e))?;
        Self::load_with_base(path, &cwd)
    }

    /// Loads settings from `path`, resolving defaults against `base`.
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file is not a YAML mapping
    /// - `similarity_ratio` is not a number in `[0, 1]`
    pub fn load_with_base<P: AsRef<Path>>(path: P, base: &Path) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let params = Self::read_params(&path)?;
        let settings = Self::settings_from(&params, base)?;

        info!(
            config = %path.display(),
            info_path = %settings.info_path.display(),
            files_path = %settings.files_path.display(),
            files_new_path = %settings.files_new_path.display(),
            similarity_ratio = settings.similarity_ratio,
            "Loaded configuration"
        );

        Ok(Self {
            path,
            params,
            settings,
        })
    }

    fn read_params(path: &Path) -> EngineResult<Mapping> {
        let path_str = path.display().to_string();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(config = %path_str, "Configuration file missing, using defaults");
                return Ok(Mapping::new());
            }
            Err(e) => return Err(EngineError::io(path, e)),
        };

        let value: Value =
            serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
                path: path_str.clone(),
                message: e.to_string(),
            })?;

        match value {
            Value::Null => Ok(Mapping::new()),
            Value::Mapping(mapping) => Ok(mapping),
            other => Err(EngineError::ConfigParseError {
                path: path_str,
                message: format!("expected a mapping, found {:?}", other),
            }),
        }
    }

    /// Renders a scalar YAML value as text; null and empty strings are absent.
    fn scalar(params: &Mapping, key: SettingKey) -> Option<String> {
        let text = match params.get(key.as_str())? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.trim().is_empty()).then_some(text)
    }

    fn settings_from(params: &Mapping, base: &Path) -> EngineResult<Settings> {
        let mut settings = Settings::with_base(base);
        for key in SettingKey::ALL {
            if let Some(value) = Self::scalar(params, key) {
                Self::apply(&mut settings, key, &value)?;
            }
        }
        Ok(settings)
    }

    fn apply(settings: &mut Settings, key: SettingKey, value: &str) -> EngineResult<()> {
        match key {
            SettingKey::InfoPath => settings.info_path = PathBuf::from(value),
            SettingKey::FilesPath => settings.files_path = PathBuf::from(value),
            SettingKey::FilesNewPath => settings.files_new_path = PathBuf::from(value),
            SettingKey::Password => settings.password = Some(value.to_string()),
            SettingKey::SimilarityRatio => {
                settings.similarity_ratio = parse_similarity_ratio(value)?
            }
        }
        Ok(())
    }

    /// Returns the configuration file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sets one option, persists the file and updates the in-memory value.
    ///
    /// The value is validated before anything is written; a rejected value
    /// leaves both the file and the store unchanged.
    ///
    /// # Arguments
    ///
    /// * `key` - The option to set
    /// * `value` - The new value as entered by the user
    pub fn update(&mut self, key: SettingKey, value: &str) -> EngineResult<()> {
        let mut settings = self.settings.clone();
        Self::apply(&mut settings, key, value)?;

        let yaml_value = match key {
            SettingKey::SimilarityRatio => Value::Number(settings.similarity_ratio.into()),
            _ => Value::String(value.to_string()),
        };
        let mut params = self.params.clone();
        params.insert(Value::String(key.as_str().to_string()), yaml_value);

        self.save(&params)?;
        self.params = params;
        self.settings = settings;

        info!(config = %self.path.display(), option = %key, "Updated configuration option");
        Ok(())
    }

    fn save(&self, params: &Mapping) -> EngineResult<()> {
        let write_error = |message: String| EngineError::ConfigWriteError {
            path: self.path.display().to_string(),
            message,
        };
        let content = serde_yaml::to_string(params).map_err(|e| write_error(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
        fs::write(&self.path, content).map_err(|e| write_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    /// CF-001: missing file yields defaults
    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load_with_base(dir.path().join("config.yaml"), dir.path()).unwrap();
        assert_eq!(store.settings(), &Settings::with_base(dir.path()));
    }

    /// CF-002: explicit values override defaults
    #[test]
    fn test_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "files_path: /data/in\npassword: 1234\nsimilarity_ratio: 0.9\n",
        );
        let store = ConfigStore::load_with_base(&path, dir.path()).unwrap();
        let settings = store.settings();
        assert_eq!(settings.files_path, Path::new("/data/in"));
        assert_eq!(settings.files_new_path, dir.path().join("files_new"));
        assert_eq!(settings.password.as_deref(), Some("1234"));
        assert_eq!(settings.similarity_ratio, 0.9);
    }

    #[test]
    fn test_empty_file_and_null_values() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "info_path:\npassword: ''\n");
        let store = ConfigStore::load_with_base(&path, dir.path()).unwrap();
        assert_eq!(store.settings(), &Settings::with_base(dir.path()));

        let empty = write_config(&dir, "");
        assert!(ConfigStore::load_with_base(&empty, dir.path()).is_ok());
    }

    #[test]
    fn test_non_mapping_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "- a\n- b\n");
        let err = ConfigStore::load_with_base(&path, dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigParseError { .. }));
    }

    #[test]
    fn test_out_of_range_ratio_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "similarity_ratio: 2\n");
        let err = ConfigStore::load_with_base(&path, dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSetting { .. }));
    }

    /// CF-003: update persists and keeps unknown keys
    #[test]
    fn test_update_persists_and_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "theme: dark\nfiles_path: /data/in\n");
        let mut store = ConfigStore::load_with_base(&path, dir.path()).unwrap();

        store.update(SettingKey::FilesNewPath, "/data/out").unwrap();
        store.update(SettingKey::SimilarityRatio, "0.7").unwrap();
        assert_eq!(store.settings().files_new_path, Path::new("/data/out"));
        assert_eq!(store.settings().similarity_ratio, 0.7);

        let reloaded = ConfigStore::load_with_base(&path, dir.path()).unwrap();
        assert_eq!(reloaded.settings(), store.settings());

        let raw: Value = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"].as_str(), Some("dark"));
        assert_eq!(raw["similarity_ratio"].as_f64(), Some(0.7));
    }

    /// CF-004: rejected value leaves store and file untouched
    #[test]
    fn test_rejected_update_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let mut store = ConfigStore::load_with_base(&path, dir.path()).unwrap();

        assert!(store.update(SettingKey::SimilarityRatio, "-0.1").is_err());
        assert_eq!(store.settings().similarity_ratio, 0.8);
        assert!(!path.exists());
    }
}
