use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use crate::analysis::{DrawishSelector, EngineMessage, NULL_MOVES};
use crate::config::MonkFishConfig;
use crate::errors::{MonkFishError, Result};
use crate::line_reader::LineReader;
use crate::position::Position;
use crate::uci_options::OptionRegistry;

/// How long a freshly spawned engine must stay alive before we talk to it
const STARTUP_GRACE: Duration = Duration::from_millis(100);
/// How long `quit` waits for a graceful exit before killing the process
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// Values pushed to the engine with `setoption`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub use_nnue: bool,
    pub skill_level: i32,
    pub multipv: i32,
    pub hash_mb: i32,
    pub threads: i32,
}

impl EngineSettings {
    /// Static defaults, used when no option registry is available
    pub fn from_config(config: &MonkFishConfig) -> Self {
        Self {
            use_nnue: config.engine.use_nnue,
            skill_level: config.engine.skill_level,
            multipv: config.engine.multipv,
            hash_mb: 128,
            threads: 1,
        }
    }

    pub fn from_options(options: &OptionRegistry) -> Self {
        Self {
            use_nnue: options.use_nnue(),
            skill_level: options.skill_level(),
            multipv: options.multipv(),
            hash_mb: options.hash(),
            threads: options.threads(),
        }
    }

    pub fn resolve(config: &MonkFishConfig, options: Option<&OptionRegistry>) -> Self {
        options.map_or_else(|| Self::from_config(config), Self::from_options)
    }

    /// One `setoption` command per parameter, in the order they are sent
    pub fn setoption_commands(&self) -> Vec<String> {
        [
            ("UCI_UseNNUE", self.use_nnue.to_string()),
            ("Skill Level", self.skill_level.to_string()),
            ("MultiPV", self.multipv.to_string()),
            ("Hash", self.hash_mb.to_string()),
            ("Threads", self.threads.to_string()),
        ]
        .into_iter()
        .map(|(name, value)| format!("setoption name {name} value {value}"))
        .collect()
    }
}

/// Outcome of a drawing-move search
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingMove {
    /// Move to report to the GUI
    pub best_move: String,
    /// Evaluation in pawns of the drawish candidate, 0.0 when none qualified
    pub score: f64,
    /// The engine's own terminal choice
    pub engine_move: String,
    /// Whether `best_move` came from a line inside the drawing threshold
    pub drawish: bool,
}

enum ReadOutcome {
    Line(String),
    Closed,
    TimedOut,
}

/// Live engine process and its pipes
struct EngineSession {
    child: Child,
    stdin: ChildStdin,
    stdout: LineReader<BufReader<ChildStdout>>,
}

impl EngineSession {
    async fn send(&mut self, command: &str) -> Result<()> {
        debug!(target: "monkfish::engine", "> {command}");
        self.stdin.write_all(format!("{command}\n").as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self, deadline: Instant) -> Result<ReadOutcome> {
        match timeout_at(deadline, self.stdout.next_line()).await {
            Err(_) => Ok(ReadOutcome::TimedOut),
            Ok(Ok(Some(line))) => {
                trace!(target: "monkfish::engine", "< {line}");
                Ok(ReadOutcome::Line(line))
            }
            Ok(Ok(None)) => Ok(ReadOutcome::Closed),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Owns one external engine process for the lifetime of a session.
///
/// Every wait on the process is bounded: acknowledgements use the handshake
/// timeout, searches the search timeout, both from the configuration.
pub struct EngineDriver {
    config: MonkFishConfig,
    session: Option<EngineSession>,
}

impl EngineDriver {
    /// Spawn the engine, perform the UCI handshake and push the configuration
    pub async fn start(config: MonkFishConfig, options: Option<&OptionRegistry>) -> Result<Self> {
        let path = resolve_engine_path(&config.engine.stockfish_path)?;
        info!("Starting engine {}", path.display());

        let mut child = Command::new(&path)
            .args(&config.engine.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MonkFishError::EngineStartupFailure(format!(
                    "failed to spawn {}: {e}",
                    path.display()
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            MonkFishError::EngineStartupFailure("failed to get stdin handle".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            MonkFishError::EngineStartupFailure("failed to get stdout handle".to_string())
        })?;
        let stderr = child.stderr.take();

        sleep(STARTUP_GRACE).await;
        if let Some(status) = child.try_wait()? {
            let captured = match stderr {
                Some(stderr) => read_captured(stderr).await,
                None => String::new(),
            };
            return Err(MonkFishError::EngineStartupFailure(format!(
                "engine exited with {status}: {}",
                captured.trim()
            )));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(forward_stderr(stderr));
        }

        let mut driver = Self {
            config,
            session: Some(EngineSession {
                child,
                stdin,
                stdout: LineReader::new(BufReader::new(stdout)),
            }),
        };

        driver.send_command("uci").await?;
        driver.await_ack("uci", &EngineMessage::UciOk).await?;
        driver.configure(options).await?;
        driver.synchronize().await?;

        info!("Engine ready");
        Ok(driver)
    }

    /// Whether the process is still alive
    pub fn is_running(&mut self) -> bool {
        self.session.as_mut().is_some_and(EngineSession::is_running)
    }

    fn session_mut(&mut self) -> Result<&mut EngineSession> {
        self.session
            .as_mut()
            .ok_or(MonkFishError::EngineProcessNotRunning)
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        self.session_mut()?.send(command).await
    }

    /// Read until `ack` arrives, bounded by the handshake timeout
    async fn await_ack(&mut self, command: &str, ack: &EngineMessage) -> Result<()> {
        let waited = self.config.handshake_timeout();
        let deadline = Instant::now() + waited;
        let session = self.session_mut()?;

        loop {
            match session.next_line(deadline).await? {
                ReadOutcome::Line(line) => {
                    if EngineMessage::parse(&line) == *ack {
                        return Ok(());
                    }
                }
                ReadOutcome::Closed => {
                    return Err(MonkFishError::ProcessTerminatedUnexpectedly(format!(
                        "the answer to '{command}'"
                    )))
                }
                ReadOutcome::TimedOut => {
                    return Err(MonkFishError::HandshakeTimeout {
                        command: command.to_string(),
                        waited,
                    })
                }
            }
        }
    }

    /// Send one `setoption` per engine parameter
    async fn configure(&mut self, options: Option<&OptionRegistry>) -> Result<()> {
        let settings = EngineSettings::resolve(&self.config, options);
        debug!("Configuring engine: {settings:?}");
        for command in settings.setoption_commands() {
            self.send_command(&command).await?;
        }
        Ok(())
    }

    /// `isready` / `readyok` exchange. Anything the engine prints before
    /// `readyok` is discarded.
    pub async fn synchronize(&mut self) -> Result<()> {
        self.send_command("isready").await?;
        self.await_ack("isready", &EngineMessage::ReadyOk).await
    }

    /// Push the current option values to the running engine
    pub async fn update_options(&mut self, options: Option<&OptionRegistry>) -> Result<()> {
        if !self.is_running() {
            return Err(MonkFishError::EngineProcessNotRunning);
        }
        self.configure(options).await?;
        self.synchronize().await
    }

    /// Search `position` and pick the most recent line whose evaluation is
    /// within the drawing threshold, falling back to the engine's best move.
    pub async fn get_drawing_move(
        &mut self,
        position: &Position,
        depth: Option<u32>,
        options: Option<&OptionRegistry>,
    ) -> Result<DrawingMove> {
        if !self.is_running() {
            self.session = None;
            return Err(MonkFishError::EngineProcessNotRunning);
        }

        let depth = depth
            .or_else(|| options.map(OptionRegistry::search_depth))
            .unwrap_or(self.config.search.default_depth);
        let threshold = options.map_or(
            self.config.search.drawing_threshold,
            OptionRegistry::drawing_threshold,
        );

        self.send_command(&position.to_engine_command()).await?;
        self.send_command(&format!("go depth {depth}")).await?;

        let result = self.read_search(threshold).await;
        match &result {
            Ok(found) => debug!(
                "Selected {} (score {:.2}, engine preferred {})",
                found.best_move, found.score, found.engine_move
            ),
            Err(MonkFishError::EngineResponseTimeout(_)) => self.resynchronize().await,
            Err(e) if e.is_fatal_to_session() => {
                warn!("Dropping engine session: {e}");
                self.release().await;
            }
            Err(_) => {}
        }
        result
    }

    async fn read_search(&mut self, threshold: f64) -> Result<DrawingMove> {
        let waited = self.config.search_timeout();
        let deadline = Instant::now() + waited;
        let mut selector = DrawishSelector::new(threshold);
        let session = self.session_mut()?;

        loop {
            match session.next_line(deadline).await? {
                ReadOutcome::Line(line) => match EngineMessage::parse(&line) {
                    EngineMessage::BestMove { best_move, .. } => {
                        if NULL_MOVES.contains(&best_move.as_str()) {
                            return Err(MonkFishError::NoLegalMoves);
                        }
                        let score = selector.score();
                        let found = match selector.into_candidate() {
                            Some(candidate) => DrawingMove {
                                best_move: candidate.pv_move,
                                score,
                                engine_move: best_move,
                                drawish: true,
                            },
                            None => DrawingMove {
                                best_move: best_move.clone(),
                                score,
                                engine_move: best_move,
                                drawish: false,
                            },
                        };
                        return Ok(found);
                    }
                    EngineMessage::Info(analysis) => {
                        if selector.observe(analysis) {
                            trace!("Drawish candidate: {line}");
                        }
                    }
                    _ => {}
                },
                ReadOutcome::Closed => {
                    return Err(MonkFishError::ProcessTerminatedUnexpectedly(
                        "bestmove".to_string(),
                    ))
                }
                ReadOutcome::TimedOut => return Err(MonkFishError::EngineResponseTimeout(waited)),
            }
        }
    }

    /// Abandon a search that overran its deadline. The late `bestmove` is
    /// consumed here so the next search cannot mistake it for its own.
    async fn resynchronize(&mut self) {
        let outcome = match self.send_command("stop").await {
            Ok(()) => self.synchronize().await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            warn!("Engine did not recover after a timed out search: {e}");
            self.release().await;
        }
    }

    /// Kill the process without the `quit` courtesy
    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = session.child.kill().await;
        }
    }

    /// Ask the engine to exit, kill it if it does not. Safe to call repeatedly.
    pub async fn quit(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Err(e) = session.send("quit").await {
            debug!("Could not send quit: {e}");
        }
        match timeout(QUIT_GRACE, session.child.wait()).await {
            Ok(Ok(status)) => info!("Engine exited with {status}"),
            _ => {
                warn!("Engine ignored quit, killing it");
                let _ = session.child.kill().await;
            }
        }
    }
}

/// Locate the engine executable.
///
/// A bare file name that does not exist relative to the working directory is
/// looked up on `PATH`.
pub fn resolve_engine_path(path: &Path) -> Result<PathBuf> {
    let candidate = if path.exists() {
        Some(path.to_path_buf())
    } else if path.components().count() == 1 {
        env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(path))
                .find(|full| full.is_file())
        })
    } else {
        None
    };

    let found = candidate.ok_or_else(|| MonkFishError::EngineNotFound(path.to_path_buf()))?;
    if is_executable(&found) {
        Ok(found)
    } else {
        Err(MonkFishError::EngineNotExecutable(found))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

async fn read_captured(mut stderr: ChildStderr) -> String {
    let mut captured = String::new();
    let _ = timeout(STARTUP_GRACE, stderr.read_to_string(&mut captured)).await;
    captured
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = LineReader::new(BufReader::new(stderr));
    while let Ok(Some(line)) = lines.next_line().await {
        warn!(target: "monkfish::engine", "engine stderr: {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = MonkFishConfig::default();
        config.engine.use_nnue = true;
        config.engine.skill_level = 7;

        let settings = EngineSettings::resolve(&config, None);
        assert_eq!(
            settings.setoption_commands(),
            vec![
                "setoption name UCI_UseNNUE value true",
                "setoption name Skill Level value 7",
                "setoption name MultiPV value 40",
                "setoption name Hash value 128",
                "setoption name Threads value 1",
            ]
        );
    }

    #[test]
    fn test_settings_prefer_live_options() {
        let config = MonkFishConfig::default();
        let mut options = OptionRegistry::new(&config);
        assert!(options.try_set("Hash", "512"));
        assert!(options.try_set("Threads", "4"));
        assert!(options.try_set("MonkFish_Skill", "20"));

        let settings = EngineSettings::resolve(&config, Some(&options));
        assert_eq!(settings.hash_mb, 512);
        assert_eq!(settings.threads, 4);
        assert_eq!(settings.skill_level, 20);
        assert!(!settings.use_nnue);
    }

    #[test]
    fn test_missing_engine_path() {
        let err = resolve_engine_path(Path::new("./definitely/not/here/stockfish")).unwrap_err();
        assert!(matches!(err, MonkFishError::EngineNotFound(_)));

        let err = resolve_engine_path(Path::new("no-such-engine-on-path-0b1f")).unwrap_err();
        assert!(matches!(err, MonkFishError::EngineNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_without_execute_bit() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stockfish");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();

        let err = resolve_engine_path(&path).unwrap_err();
        assert!(matches!(err, MonkFishError::EngineNotExecutable(_)));

        // A directory is never an engine
        let err = resolve_engine_path(dir.path()).unwrap_err();
        assert!(matches!(err, MonkFishError::EngineNotExecutable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_on_path() {
        let found = resolve_engine_path(Path::new("sh")).unwrap();
        assert!(found.ends_with("sh"));
    }

    #[tokio::test]
    async fn test_start_reports_missing_engine() {
        let mut config = MonkFishConfig::default();
        config.engine.stockfish_path = PathBuf::from("./missing/stockfish");
        let err = EngineDriver::start(config, None).await.err().unwrap();
        assert!(matches!(err, MonkFishError::EngineNotFound(_)));
    }
}
