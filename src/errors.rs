use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error types for the engine driver, option registry and command dispatcher
#[derive(Debug, Error)]
pub enum MonkFishError {
    /// The configured engine executable does not exist
    #[error("Engine not found at {}", .0.display())]
    EngineNotFound(PathBuf),
    /// The engine path exists but cannot be executed
    #[error("Engine at {} is not executable", .0.display())]
    EngineNotExecutable(PathBuf),
    /// The engine process exited right after being spawned
    #[error("Engine failed to start: {0}")]
    EngineStartupFailure(String),
    /// No acknowledgement for a handshake or readiness exchange in time
    #[error("Engine did not answer '{command}' within {}ms", .waited.as_millis())]
    HandshakeTimeout { command: String, waited: Duration },
    /// The engine closed its output stream while we were waiting on it
    #[error("Engine process terminated unexpectedly while waiting for {0}")]
    ProcessTerminatedUnexpectedly(String),
    /// A request was made without a live engine process
    #[error("Engine process is not running")]
    EngineProcessNotRunning,
    /// A search produced no terminal line before its deadline
    #[error("Engine gave no bestmove within {}ms", .0.as_millis())]
    EngineResponseTimeout(Duration),
    /// The engine reported that the side to move has no legal move
    #[error("No legal moves in the current position")]
    NoLegalMoves,
    /// Option assignment rejected by the registry
    #[error("Invalid value for {name}: {value}")]
    InvalidOptionValue { name: String, value: String },
    /// A front-end command that does not follow the protocol grammar
    #[error("Invalid command format: {0}")]
    InvalidCommandFormat(String),
    /// Configuration file could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),
    /// Pipe or process I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, MonkFishError>;

impl From<serde_json::Error> for MonkFishError {
    fn from(error: serde_json::Error) -> Self {
        MonkFishError::Config(format!("JSON error: {error}"))
    }
}

impl MonkFishError {
    /// Errors after which the engine process can no longer be trusted
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            MonkFishError::ProcessTerminatedUnexpectedly(_)
                | MonkFishError::EngineProcessNotRunning
                | MonkFishError::Io(_)
        )
    }
}
