//! Parsing of the lines an analysis engine writes on its standard output.
//!
//! Only the handful of messages the driver reacts to are recognised; anything
//! else comes back as `EngineMessage::Other` and is skipped by the caller.

/// Move token an engine reports when the side to move has no legal move
pub const NULL_MOVES: [&str; 2] = ["(none)", "0000"];

/// One progress line of a running search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisLine {
    pub depth: u32,
    /// Centipawns from the engine's point of view
    pub score_cp: i32,
    /// First move of the principal variation
    pub pv_move: String,
}

impl AnalysisLine {
    /// Evaluation in pawns
    pub fn score(&self) -> f64 {
        f64::from(self.score_cp) / 100.0
    }

    /// Whether the evaluation is small enough to count as drawish
    pub fn within(&self, threshold: f64) -> bool {
        self.score().abs() <= threshold
    }

    /// Parse `... depth <n> ... score cp <cp> ... pv <move> ...`.
    ///
    /// The three markers must appear in that order. Mate scores, bound-only
    /// lines without a pv and malformed numbers all yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let depth_idx = tokens.iter().position(|&t| t == "depth")?;
        let depth = tokens.get(depth_idx + 1)?.parse::<u32>().ok()?;

        let rest = &tokens[depth_idx + 2..];
        let score_idx = rest
            .windows(2)
            .position(|pair| pair[0] == "score" && pair[1] == "cp")?;
        let score_cp = rest.get(score_idx + 2)?.parse::<i32>().ok()?;

        let rest = &rest[score_idx + 3..];
        let pv_idx = rest.iter().position(|&t| t == "pv")?;
        let pv_move = rest.get(pv_idx + 1).filter(|m| is_coordinate_move(m))?;

        Some(Self {
            depth,
            score_cp,
            pv_move: (*pv_move).to_string(),
        })
    }
}

/// A `from`-`to` square pair with an optional promotion piece, e.g. `e2e4`, `a7a8q`
pub fn is_coordinate_move(token: &str) -> bool {
    let bytes = token.as_bytes();
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);

    match bytes.len() {
        4 => square(bytes[0], bytes[1]) && square(bytes[2], bytes[3]),
        5 => {
            square(bytes[0], bytes[1])
                && square(bytes[2], bytes[3])
                && matches!(bytes[4], b'n' | b'b' | b'r' | b'q')
        }
        _ => false,
    }
}

/// Messages the driver cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    UciOk,
    ReadyOk,
    BestMove {
        best_move: String,
        ponder: Option<String>,
    },
    Info(AnalysisLine),
    Other,
}

impl EngineMessage {
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("uciok") => EngineMessage::UciOk,
            Some("readyok") => EngineMessage::ReadyOk,
            Some("bestmove") => match parts.next() {
                Some(best_move) => {
                    let ponder = match (parts.next(), parts.next()) {
                        (Some("ponder"), Some(m)) => Some(m.to_string()),
                        _ => None,
                    };
                    EngineMessage::BestMove {
                        best_move: best_move.to_string(),
                        ponder,
                    }
                }
                None => EngineMessage::Other,
            },
            Some("info") => AnalysisLine::parse(line)
                .map(EngineMessage::Info)
                .unwrap_or(EngineMessage::Other),
            _ => EngineMessage::Other,
        }
    }
}

/// Tracks the drawish candidate while a search streams its analysis lines.
///
/// The most recent qualifying line always replaces the previous one, so a
/// later, deeper line wins over an earlier one even if its score is further
/// from zero.
#[derive(Debug, Clone)]
pub struct DrawishSelector {
    threshold: f64,
    candidate: Option<AnalysisLine>,
}

impl DrawishSelector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            candidate: None,
        }
    }

    /// Returns true when the line was retained
    pub fn observe(&mut self, line: AnalysisLine) -> bool {
        if line.within(self.threshold) {
            self.candidate = Some(line);
            true
        } else {
            false
        }
    }

    pub fn candidate(&self) -> Option<&AnalysisLine> {
        self.candidate.as_ref()
    }

    /// Score of the retained candidate, 0.0 when nothing qualified
    pub fn score(&self) -> f64 {
        self.candidate.as_ref().map_or(0.0, AnalysisLine::score)
    }

    pub fn into_candidate(self) -> Option<AnalysisLine> {
        self.candidate
    }
}
