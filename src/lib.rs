//! # MonkFish
//!
//! A UCI front end that sits between a chess GUI and a Stockfish process and
//! steers play toward drawn positions. Instead of the strongest move, it
//! reports the most recent analysed move whose evaluation stays within a
//! small "drawing threshold" of zero.
//!
//! ## Layout
//!
//! - [`uci`]: the command dispatcher speaking UCI to the GUI
//! - [`engine_driver`]: owns the Stockfish process and runs searches
//! - [`uci_options`]: the option catalogue advertised on `uci`
//! - [`analysis`]: parsing of engine output and drawish move selection
//! - [`position`]: the position declared by the GUI
//! - [`config`]: the JSON configuration file
//! - [`requirements`]: the `monkfish check` report
//!
//! ## Quick Start
//!
//! ```no_run
//! use monkfish::{run_uci_engine, MonkFishConfig};
//! use std::path::Path;
//!
//! # async fn demo() -> monkfish::Result<()> {
//! let config = MonkFishConfig::load(Path::new("monkfish_config.json"));
//! run_uci_engine(config).await
//! # }
//! ```

// Core modules
pub mod config;
pub mod errors;

pub mod analysis;
pub mod engine_driver;
pub mod line_reader;
pub mod position;
pub mod requirements;
pub mod uci;
pub mod uci_options;

// Re-export commonly used types
pub use analysis::{AnalysisLine, DrawishSelector, EngineMessage};
pub use config::{MonkFishConfig, DEFAULT_CONFIG_FILE};
pub use engine_driver::{resolve_engine_path, DrawingMove, EngineDriver, EngineSettings};
pub use errors::{MonkFishError, Result};
pub use position::Position;
pub use requirements::RequirementsReport;
pub use uci::{run_uci_engine, SessionState, UCIEngine};
pub use uci_options::{OptionRegistry, OptionValue, UCIOption};
