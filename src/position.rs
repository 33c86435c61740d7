use std::fmt;

use crate::errors::{MonkFishError, Result};

/// Game state as declared by the GUI. No chess knowledge is applied here:
/// the moves and the FEN are forwarded to the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    StartPos { moves: Vec<String> },
    Fen { fen: String, moves: Vec<String> },
}

impl Position {
    pub fn startpos<I, S>(moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Position::StartPos {
            moves: moves.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a full `position ...` command line
    pub fn from_command(command: &str) -> Result<Self> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.first() != Some(&"position") {
            return Err(MonkFishError::InvalidCommandFormat(command.to_string()));
        }
        Self::from_parts(&parts[1..])
            .ok_or_else(|| MonkFishError::InvalidCommandFormat(command.to_string()))
    }

    fn from_parts(parts: &[&str]) -> Option<Self> {
        let moves_idx = parts.iter().position(|&p| p == "moves");
        let (head, moves) = match moves_idx {
            Some(idx) => (&parts[..idx], &parts[idx + 1..]),
            None => (parts, &[][..]),
        };
        let moves: Vec<String> = moves.iter().map(|m| (*m).to_string()).collect();

        match head.split_first()? {
            (&"startpos", []) => Some(Position::StartPos { moves }),
            (&"fen", fen) if !fen.is_empty() => Some(Position::Fen {
                fen: fen.join(" "),
                moves,
            }),
            _ => None,
        }
    }

    pub fn moves(&self) -> &[String] {
        match self {
            Position::StartPos { moves } | Position::Fen { moves, .. } => moves,
        }
    }

    /// The `position` command to send to the engine
    pub fn to_engine_command(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::StartPos { .. } => write!(f, "position startpos")?,
            Position::Fen { fen, .. } => write!(f, "position fen {fen}")?,
        }
        if !self.moves().is_empty() {
            write!(f, " moves {}", self.moves().join(" "))?;
        }
        Ok(())
    }
}
