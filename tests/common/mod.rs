//! Scripted stand-in for Stockfish.
//!
//! Each fake engine is a small shell script run through `/bin/sh`. It logs
//! every command it receives and answers `uci` and `isready` like a real
//! engine. The reply to `go` is supplied by the test.
use monkfish::MonkFishConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub const INITIAL_SETOPTIONS: [&str; 5] = [
    "setoption name UCI_UseNNUE value false",
    "setoption name Skill Level value 3",
    "setoption name MultiPV value 40",
    "setoption name Hash value 128",
    "setoption name Threads value 1",
];

pub struct FakeEngine {
    dir: TempDir,
    script: PathBuf,
}

#[allow(dead_code)]
impl FakeEngine {
    /// A well-behaved engine; `go_reply` is the shell snippet run on `go`
    pub fn new(go_reply: &str) -> Self {
        Self::with_handlers(&[
            ("uci", "echo 'id name FakeFish'; echo 'uciok'"),
            ("isready", "echo 'readyok'"),
            ("go*", go_reply),
            ("quit", "exit 0"),
        ])
    }

    /// Replies the engine prints on `go`, one `echo` per line
    pub fn replying(lines: &[&str]) -> Self {
        Self::new(&echo_all(lines))
    }

    /// Full control over the `case` arms of the script
    pub fn with_handlers(handlers: &[(&str, &str)]) -> Self {
        let arms: String = handlers
            .iter()
            .map(|(pattern, body)| format!("    {pattern}) {body} ;;\n"))
            .collect();
        Self::from_body(&format!(
            "searches=0\n\
             while IFS= read -r line; do\n\
             \x20   echo \"$line\" >> \"$LOG\"\n\
             \x20   case \"$line\" in\n\
             {arms}\
             \x20   esac\n\
             done\n"
        ))
    }

    /// Raw script body; `$LOG` names the command log
    pub fn from_body(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake_engine.sh");
        let log = dir.path().join("commands.log");
        fs::write(&script, format!("LOG='{}'\n{body}", log.display())).unwrap();
        Self { dir, script }
    }

    /// Configuration pointing at this engine, with short timeouts
    pub fn config(&self) -> MonkFishConfig {
        let mut config = MonkFishConfig::default();
        config.engine.stockfish_path = PathBuf::from("/bin/sh");
        config.engine.args = vec![self.script.display().to_string()];
        config.engine.handshake_timeout_ms = 1_000;
        config.engine.search_timeout_ms = 2_000;
        config
    }

    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("commands.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Shell snippet printing each line in turn
pub fn echo_all(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| format!("echo '{line}'"))
        .collect::<Vec<_>>()
        .join("; ")
}
