//! Move tree replay into a linear history of positions

use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode};
use thiserror::Error;

use crate::parser::{GameRecord, MoveNode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("cannot read '{0}' as a move")]
    Unreadable(String),

    #[error("'{0}' is not legal in this position")]
    Illegal(String),
}

/// One applied ply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Position after the move
    pub fen: String,
    /// Full-move number, `ceil(ply / 2)`
    pub move_number: usize,
    /// Location in the source tree: `[i]` for main-line move `i`, and
    /// `parent ++ [variation, j]` for move `j` of a variation.
    pub path: Vec<usize>,
    /// The move as applied, with check and mate suffixes
    pub san: String,
    pub uci: String,
    pub comments: Option<String>,
    pub nags: Vec<u8>,
    /// Replays of the source variations, from the position before this move
    pub variations: Vec<Vec<HistoryEntry>>,
}

/// A successfully applied move
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub position: Chess,
    pub san: String,
    pub uci: String,
}

pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// Applies a SAN move to a copy of `position`.
pub fn apply_san(position: &Chess, notation: &str) -> Result<AppliedMove, ReplayError> {
    let token = notation.trim().trim_end_matches(['!', '?']);
    let san_plus = SanPlus::from_ascii(token.as_bytes())
        .map_err(|_| ReplayError::Unreadable(notation.to_string()))?;
    let m = san_plus
        .san
        .to_move(position)
        .map_err(|_| ReplayError::Illegal(notation.to_string()))?;

    let uci = UciMove::from_move(m, CastlingMode::Standard).to_string();
    let mut next = position.clone();
    let applied = SanPlus::from_move_and_play_unchecked(&mut next, m);

    Ok(AppliedMove {
        position: next,
        san: applied.to_string(),
        uci,
    })
}

fn build_entry(
    before: &Chess,
    ply_before: usize,
    node: &MoveNode,
    path: &[usize],
) -> Result<(Chess, HistoryEntry), ReplayError> {
    let applied = apply_san(before, &node.notation)?;

    let variations = node
        .variations
        .iter()
        .enumerate()
        .map(|(v, line)| {
            let mut base = path.to_vec();
            base.push(v);
            replay_line(before, ply_before, line, &base)
        })
        .collect();

    let entry = HistoryEntry {
        fen: fen_of(&applied.position),
        move_number: (ply_before + 1).div_ceil(2),
        path: path.to_vec(),
        san: applied.san,
        uci: applied.uci,
        comments: node.comment_text(),
        nags: node.nags.clone(),
        variations,
    };

    Ok((applied.position, entry))
}

/// Replays a side line independently; failures only shorten that line.
fn replay_line(
    start: &Chess,
    ply_before: usize,
    moves: &[MoveNode],
    base_path: &[usize],
) -> Vec<HistoryEntry> {
    let mut position = start.clone();
    let mut entries = Vec::new();

    for (j, node) in moves.iter().enumerate() {
        let mut path = base_path.to_vec();
        path.push(j);

        match build_entry(&position, ply_before + entries.len(), node, &path) {
            Ok((next, entry)) => {
                position = next;
                entries.push(entry);
            }
            Err(e) => {
                tracing::warn!("Skipping variation move at {:?}: {}", path, e);
            }
        }
    }

    entries
}

/// Replays a game's main line from the standard starting position.
#[derive(Debug, Clone, Default)]
pub struct Replayer {
    position: Chess,
    history: Vec<HistoryEntry>,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the starting position with an empty history
    pub fn reset(&mut self) {
        self.position = Chess::default();
        self.history.clear();
    }

    /// Rebuilds the history for `game` from ply 0. Moves that cannot be
    /// applied are skipped; the line continues from the last good position.
    pub fn load_game(&mut self, game: &GameRecord) -> &[HistoryEntry] {
        self.reset();

        for (i, node) in game.moves.iter().enumerate() {
            if let Err(e) = self.apply_move(node, vec![i]) {
                tracing::warn!("Skipping move {} ({}): {}", i + 1, node.notation, e);
            }
        }

        &self.history
    }

    /// Applies one node on top of the current position.
    pub fn apply_move(
        &mut self,
        node: &MoveNode,
        path: Vec<usize>,
    ) -> Result<&HistoryEntry, ReplayError> {
        let (next, entry) = build_entry(&self.position, self.history.len(), node, &path)?;
        self.position = next;
        self.history.push(entry);
        Ok(&self.history[self.history.len() - 1])
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn into_history(self) -> Vec<HistoryEntry> {
        self.history
    }
}
