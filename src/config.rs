use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::Result;

/// Default location of the configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "monkfish_config.json";

/// Engine process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub stockfish_path: PathBuf,
    /// Extra arguments passed to the engine executable
    pub args: Vec<String>,
    pub skill_level: i32,
    pub multipv: i32,
    pub use_nnue: bool,
    pub handshake_timeout_ms: u64,
    pub search_timeout_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            stockfish_path: PathBuf::from("./stockfish"),
            args: Vec::new(),
            skill_level: 3,
            multipv: 40,
            use_nnue: false,
            handshake_timeout_ms: 5_000,
            search_timeout_ms: 30_000,
        }
    }
}

/// Search behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub default_depth: u32,
    /// Maximum absolute evaluation, in pawns, for a move to count as drawish
    pub drawing_threshold: f64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            default_depth: 2,
            drawing_threshold: 0.01,
        }
    }
}

/// Identity reported to the GUI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoSection {
    pub name: String,
    pub author: String,
}

impl Default for InfoSection {
    fn default() -> Self {
        Self {
            name: "MonkFish".to_string(),
            author: "Raghav Ojha".to_string(),
        }
    }
}

/// Static configuration loaded once at startup.
///
/// Every section is merged field by field over its defaults, so a file that
/// only sets `search.default_depth` keeps every other default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonkFishConfig {
    pub engine: EngineSection,
    pub search: SearchSection,
    pub info: InfoSection,
}

impl MonkFishConfig {
    /// Load the configuration at `path`.
    ///
    /// A missing file is created with the defaults (best effort). A file that
    /// cannot be read or parsed is reported and replaced by the defaults in
    /// memory only; it is never overwritten.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!("Created default configuration at {}", path.display()),
                Err(e) => debug!("Could not write default configuration: {e}"),
            }
            return config;
        }

        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Could not load {}, using defaults: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Read and parse `path` without any fallback
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.handshake_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.search_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_values() {
        let config = MonkFishConfig::default();
        assert_eq!(config.engine.stockfish_path, PathBuf::from("./stockfish"));
        assert_eq!(config.engine.skill_level, 3);
        assert_eq!(config.engine.multipv, 40);
        assert!(!config.engine.use_nnue);
        assert_eq!(config.search.default_depth, 2);
        assert_eq!(config.search.drawing_threshold, 0.01);
        assert_eq!(config.info.name, "MonkFish");
        assert_eq!(config.info.author, "Raghav Ojha");
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
        assert_eq!(config.search_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let config = MonkFishConfig::load(&path);
        assert_eq!(config, MonkFishConfig::default());
        assert!(path.exists());

        let reread = MonkFishConfig::read(&path).unwrap();
        assert_eq!(reread, config);
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let config = MonkFishConfig::from_json(
            r#"{ "search": { "default_depth": 6 }, "engine": { "skill_level": 12 } }"#,
        )
        .unwrap();

        assert_eq!(config.search.default_depth, 6);
        assert_eq!(config.search.drawing_threshold, 0.01);
        assert_eq!(config.engine.skill_level, 12);
        assert_eq!(config.engine.multipv, 40);
        assert_eq!(config.info, InfoSection::default());
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let config = MonkFishConfig::from_json(r#"{ "extra": { "anything": 1 } }"#).unwrap();
        assert_eq!(config, MonkFishConfig::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(MonkFishConfig::read(&path).is_err());
        let config = MonkFishConfig::load(&path);
        assert_eq!(config, MonkFishConfig::default());

        // The broken file is left alone
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
