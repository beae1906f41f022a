//! Configuration types for the commission engine.
//!
//! This module contains the strongly-typed settings that are read from and
//! written back to the YAML configuration file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::calculation::DEFAULT_SIMILARITY_THRESHOLD;
use crate::error::EngineError;

/// Default rulebook location, relative to the base directory.
pub const DEFAULT_RULEBOOK_PATH: &str = "zp_file/Расчет ЗП.xlsx";
/// Default input folder, relative to the base directory.
pub const DEFAULT_FILES_DIR: &str = "files";
/// Default output folder, relative to the base directory.
pub const DEFAULT_OUTPUT_DIR: &str = "files_new";

/// Effective settings for a batch run.
///
/// # Example
///
/// ```
/// use commission_engine::config::Settings;
/// use std::path::Path;
///
/// let settings = Settings::with_base(Path::new("/srv/salon"));
/// assert_eq!(settings.files_path, Path::new("/srv/salon/files"));
/// assert_eq!(settings.similarity_ratio, 0.8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the rulebook workbook.
    pub info_path: PathBuf,
    /// Folder holding the per-employee transaction files.
    pub files_path: PathBuf,
    /// Folder receiving the augmented files and the summary.
    pub files_new_path: PathBuf,
    /// Workbook password, if the exports are protected.
    pub password: Option<String>,
    /// Minimum similarity for employee and specialization fuzzy matches.
    pub similarity_ratio: f64,
}

impl Settings {
    /// Builds the default settings with paths under `base`.
    pub fn with_base(base: &Path) -> Self {
        Self {
            info_path: base.join(DEFAULT_RULEBOOK_PATH),
            files_path: base.join(DEFAULT_FILES_DIR),
            files_new_path: base.join(DEFAULT_OUTPUT_DIR),
            password: None,
            similarity_ratio: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    /// Returns the current value of one setting as text.
    pub fn get(&self, key: SettingKey) -> String {
        match key {
            SettingKey::InfoPath => self.info_path.display().to_string(),
            SettingKey::FilesPath => self.files_path.display().to_string(),
            SettingKey::FilesNewPath => self.files_new_path.display().to_string(),
            SettingKey::Password => self.password.clone().unwrap_or_default(),
            SettingKey::SimilarityRatio => self.similarity_ratio.to_string(),
        }
    }
}

/// The closed set of configuration option names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// `info_path`
    InfoPath,
    /// `files_path`
    FilesPath,
    /// `files_new_path`
    FilesNewPath,
    /// `password`
    Password,
    /// `similarity_ratio`
    SimilarityRatio,
}

impl SettingKey {
    /// Every key, in file order.
    pub const ALL: [SettingKey; 5] = [
        SettingKey::InfoPath,
        SettingKey::FilesPath,
        SettingKey::FilesNewPath,
        SettingKey::Password,
        SettingKey::SimilarityRatio,
    ];

    /// The YAML key name.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::InfoPath => "info_path",
            SettingKey::FilesPath => "files_path",
            SettingKey::FilesNewPath => "files_new_path",
            SettingKey::Password => "password",
            SettingKey::SimilarityRatio => "similarity_ratio",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| EngineError::InvalidSetting {
                key: s.to_string(),
                message: "unknown option".to_string(),
            })
    }
}

/// Parses and range-checks a similarity ratio.
pub fn parse_similarity_ratio(value: &str) -> Result<f64, EngineError> {
    let invalid = |message: &str| EngineError::InvalidSetting {
        key: SettingKey::SimilarityRatio.to_string(),
        message: message.to_string(),
    };
    let ratio: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(&format!("'{}' is not a number", value)))?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(invalid(&format!("{} is outside [0, 1]", ratio)));
    }
    Ok(ratio)
}
