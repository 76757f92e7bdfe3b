use std::path::{Path, PathBuf};

use serde::Deserialize;

use sertap_foundation::AppError;
use sertap_store::DEFAULT_STORE_CAPACITY;
use sertap_wire::constants::{DEFAULT_BAUD, DEFAULT_TICK_HZ};

/// On-disk configuration. Every field has a default, so a config file only
/// needs to name what it changes; CLI flags override the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub baud: u32,
    pub tick_hz: u32,
    pub store_capacity: usize,
    /// Live display window, in samples per channel.
    pub window: usize,
    pub output_dir: PathBuf,
    pub read_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            tick_hz: DEFAULT_TICK_HZ,
            store_capacity: DEFAULT_STORE_CAPACITY,
            window: 500,
            output_dir: PathBuf::from("."),
            read_timeout_ms: 50,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }
}
