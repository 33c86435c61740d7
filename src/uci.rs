use std::future::Future;
use tokio::io::{self, AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::MonkFishConfig;
use crate::engine_driver::EngineDriver;
use crate::errors::Result;
use crate::line_reader::LineReader;
use crate::position::Position;
use crate::uci_options::OptionRegistry;

/// Reply used whenever no move can be produced
pub const NO_MOVE: &str = "bestmove (none)";

/// Lifecycle of the engine behind the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No engine process has been started yet
    Uninitialized,
    /// Engine started and handshake complete
    Initialized,
    /// Startup was attempted and failed; it is not retried
    InitializationFailed,
    /// `quit`, end of input or interrupt was seen
    Terminated,
}

/// UCI (Universal Chess Interface) front end.
///
/// Reads one command per line, keeps the declared position and the option
/// values, and forwards searches to a lazily started [`EngineDriver`].
/// Engine failures never end the session: they are reported with an
/// `info string` line and replaced by a safe answer.
pub struct UCIEngine {
    config: MonkFishConfig,
    options: OptionRegistry,
    position: Option<Position>,
    engine: Option<EngineDriver>,
    init_error: Option<String>,
    terminated: bool,
}

impl UCIEngine {
    pub fn new(config: MonkFishConfig) -> Self {
        let options = OptionRegistry::new(&config);
        Self {
            config,
            options,
            position: None,
            engine: None,
            init_error: None,
            terminated: false,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.terminated {
            SessionState::Terminated
        } else if self.engine.is_some() {
            SessionState::Initialized
        } else if self.init_error.is_some() {
            SessionState::InitializationFailed
        } else {
            SessionState::Uninitialized
        }
    }

    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Main UCI loop over stdin/stdout, ended by `quit`, end of input or Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        let stdin = BufReader::new(io::stdin());
        let stdout = io::stdout();
        let interrupt = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal support: only quit or end of input can stop us
                std::future::pending::<()>().await;
            }
        };
        self.run_with(stdin, stdout, interrupt).await
    }

    /// Main loop over arbitrary streams. `shutdown` resolving has the same
    /// effect as an interrupt.
    pub async fn run_with<R, W, S>(&mut self, input: R, mut output: W, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = LineReader::new(input);
        tokio::pin!(shutdown);

        let outcome = loop {
            let step = tokio::select! {
                step = self.step(&mut lines, &mut output) => step,
                () = &mut shutdown => {
                    info!("Interrupted, shutting down");
                    break Ok(());
                }
            };
            match step {
                Ok(true) => continue,
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.shutdown().await;
        outcome
    }

    /// Handle one input line. Returns false once the loop should end.
    async fn step<R, W>(&mut self, lines: &mut LineReader<R>, output: &mut W) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let command = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("End of input");
                return Ok(false);
            }
            Err(e) => {
                warn!("Error reading input: {e}");
                return Ok(false);
            }
        };

        let responses = self.process_command(command.trim()).await;
        for response in responses {
            output.write_all(response.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;

        Ok(!self.terminated)
    }

    /// Process one UCI command and return the lines to send back
    pub async fn process_command(&mut self, command: &str) -> Vec<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some(&keyword) = parts.first() else {
            return Vec::new();
        };
        debug!(target: "monkfish::gui", "< {command}");

        match keyword {
            "uci" => self.handle_uci(),
            "isready" => self.handle_isready().await,
            "position" => self.handle_position(command),
            "setoption" => self.handle_setoption(&parts).await,
            "go" => self.handle_go(&parts).await,
            "stop" => self.handle_stop(),
            "ponderhit" => Vec::new(),
            "quit" => {
                self.terminated = true;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_uci(&self) -> Vec<String> {
        let mut response = vec![
            format!("id name {}", self.config.info.name),
            format!("id author {}", self.config.info.author),
        ];
        response.extend(self.options.option_strings());
        response.push("uciok".to_string());
        response
    }

    async fn handle_isready(&mut self) -> Vec<String> {
        let mut response = Vec::new();
        if let Err(reason) = self.ensure_engine().await {
            response.push(format!("info string Engine initialization failed: {reason}"));
        }
        // Always acknowledge so the GUI does not hang on a broken engine
        response.push("readyok".to_string());
        response
    }

    fn handle_position(&mut self, command: &str) -> Vec<String> {
        match Position::from_command(command) {
            Ok(position) => {
                self.position = Some(position);
                Vec::new()
            }
            Err(e) => vec![format!("info string {e}")],
        }
    }

    async fn handle_setoption(&mut self, parts: &[&str]) -> Vec<String> {
        // Parse: setoption name <name> value <value>
        let Some((name, value)) = parse_setoption(parts) else {
            debug!("Malformed setoption: {}", parts.join(" "));
            return vec!["info string Invalid setoption format".to_string()];
        };

        if let Err(e) = self.options.set_option(&name, &value) {
            return vec![format!("info string {e}")];
        }

        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.update_options(Some(&self.options)).await {
                warn!("Could not apply {name}={value} to the engine: {e}");
            }
        }
        vec![format!("info string Set {name} to {value}")]
    }

    async fn handle_go(&mut self, parts: &[&str]) -> Vec<String> {
        if self.position.is_none() {
            return vec![
                "info string No position set".to_string(),
                NO_MOVE.to_string(),
            ];
        }

        if let Err(reason) = self.ensure_engine().await {
            return vec![
                format!("info string Engine unavailable: {reason}"),
                NO_MOVE.to_string(),
            ];
        }

        let depth = parse_depth(parts);
        let (Some(engine), Some(position)) = (self.engine.as_mut(), self.position.as_ref()) else {
            return vec![NO_MOVE.to_string()];
        };

        match engine
            .get_drawing_move(position, depth, Some(&self.options))
            .await
        {
            Ok(found) => vec![format!("bestmove {}", found.best_move)],
            Err(e) => {
                warn!("Search failed: {e}");
                vec![format!("info string Error: {e}"), NO_MOVE.to_string()]
            }
        }
    }

    fn handle_stop(&self) -> Vec<String> {
        // Searches run to completion before the next command is read, so
        // there is nothing in flight to interrupt here.
        vec![NO_MOVE.to_string()]
    }

    /// Start the engine on first need. A failed start is remembered and
    /// reported again instead of being retried.
    async fn ensure_engine(&mut self) -> std::result::Result<(), String> {
        if self.engine.is_some() {
            return Ok(());
        }
        if let Some(reason) = &self.init_error {
            return Err(reason.clone());
        }

        match EngineDriver::start(self.config.clone(), Some(&self.options)).await {
            Ok(engine) => {
                self.engine = Some(engine);
                Ok(())
            }
            Err(e) => {
                warn!("Engine initialization failed: {e}");
                let reason = e.to_string();
                self.init_error = Some(reason.clone());
                Err(reason)
            }
        }
    }

    /// Stop the engine process if one was started. Idempotent.
    pub async fn shutdown(&mut self) {
        self.terminated = true;
        if let Some(mut engine) = self.engine.take() {
            engine.quit().await;
        }
    }
}

/// Split `setoption name <name...> value <value...>` into its two fields
fn parse_setoption(parts: &[&str]) -> Option<(String, String)> {
    if parts.get(1) != Some(&"name") {
        return None;
    }
    let value_idx = parts.iter().position(|&p| p == "value")?;
    let name = parts.get(2..value_idx)?.join(" ");
    let value = parts[value_idx + 1..].join(" ");
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}

/// `go depth <n>`; any other search limit is ignored
fn parse_depth(parts: &[&str]) -> Option<u32> {
    let idx = parts.iter().position(|&p| p == "depth")?;
    parts.get(idx + 1)?.parse().ok()
}

/// Run the UCI front end on stdin/stdout until `quit`, end of input or Ctrl-C
pub async fn run_uci_engine(config: MonkFishConfig) -> Result<()> {
    let mut engine = UCIEngine::new(config);
    engine.run().await
}
