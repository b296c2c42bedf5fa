use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::generator::DEFAULT_GENERATED_COUNT;
use crate::session::{PracticeMode, SessionConfig, DEFAULT_MINIMUM_IMAGE_SECS};

/// Settings remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: PracticeMode,
    pub per_image_secs: u32,
    pub total_session_secs: u32,
    pub interval_secs: u32,
    pub minimum_image_secs: u32,
    pub shuffle: bool,
    pub audible_alerts: bool,
    /// images per generated session
    pub generated_count: usize,
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: PracticeMode::Normal,
            per_image_secs: 30,
            total_session_secs: 600,
            interval_secs: 5,
            minimum_image_secs: DEFAULT_MINIMUM_IMAGE_SECS,
            shuffle: true,
            audible_alerts: false,
            generated_count: DEFAULT_GENERATED_COUNT,
            prompt: "A sphere".to_string(),
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mode: self.mode,
            per_image_secs: self.per_image_secs,
            total_session_secs: self.total_session_secs,
            interval_secs: self.interval_secs,
            minimum_image_secs: self.minimum_image_secs,
            shuffle: self.shuffle,
            audible_alerts: self.audible_alerts,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("lineflow_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {}", self.path.display(), e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
