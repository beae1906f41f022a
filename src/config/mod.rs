//! Configuration loading and management for the Commission Engine.
//!
//! This module provides functionality to load the engine settings from a YAML
//! file and to persist single-option updates.
//!
//! # Example
//!
//! ```no_run
//! use commission_engine::config::ConfigStore;
//!
//! let store = ConfigStore::load("config.yaml").unwrap();
//! println!("Rulebook: {}", store.settings().info_path.display());
//! ```

mod loader;
mod types;

pub use loader::ConfigStore;
pub use types::{
    DEFAULT_FILES_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_RULEBOOK_PATH, SettingKey, Settings,
    parse_similarity_ratio,
};
