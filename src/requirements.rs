use std::path::{Path, PathBuf};

use crate::config::MonkFishConfig;
use crate::engine_driver::resolve_engine_path;
use crate::errors::Result;

/// State of the configuration file as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Valid,
    Invalid(String),
    Missing,
}

/// Outcome of `monkfish check`.
///
/// Collecting the report only reads: a missing configuration file is reported
/// as missing, never created.
#[derive(Debug)]
pub struct RequirementsReport {
    pub platform: String,
    pub config_path: PathBuf,
    pub config_status: ConfigStatus,
    pub engine: Result<PathBuf>,
}

impl RequirementsReport {
    pub fn collect(config_path: &Path, engine_override: Option<&Path>) -> Self {
        let (config, config_status) = if config_path.exists() {
            match MonkFishConfig::read(config_path) {
                Ok(config) => (config, ConfigStatus::Valid),
                Err(e) => (MonkFishConfig::default(), ConfigStatus::Invalid(e.to_string())),
            }
        } else {
            (MonkFishConfig::default(), ConfigStatus::Missing)
        };

        let engine_path = engine_override
            .map_or_else(|| config.engine.stockfish_path.clone(), Path::to_path_buf);

        Self {
            platform: format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
            config_path: config_path.to_path_buf(),
            config_status,
            engine: resolve_engine_path(&engine_path),
        }
    }

    /// Only a usable engine is required; configuration problems fall back to defaults
    pub fn is_ready(&self) -> bool {
        self.engine.is_ok()
    }

    pub fn lines(&self) -> Vec<String> {
        let config = self.config_path.display();
        let mut lines = vec![
            "MonkFish requirements check".to_string(),
            "===========================".to_string(),
            format!("Platform: {}", self.platform),
            match &self.config_status {
                ConfigStatus::Valid => format!("✅ Configuration: {config}"),
                ConfigStatus::Invalid(reason) => {
                    format!("⚠️  Configuration: {config} ({reason}), defaults in use")
                }
                ConfigStatus::Missing => {
                    format!("⚠️  Configuration: {config} not found, defaults in use")
                }
            },
        ];

        match &self.engine {
            Ok(path) => lines.push(format!("✅ Engine: {}", path.display())),
            Err(e) => {
                lines.push(format!("❌ Engine: {e}"));
                lines.push(
                    "   Set engine.stockfish_path in the configuration or pass --engine".to_string(),
                );
            }
        }
        lines
    }
}
