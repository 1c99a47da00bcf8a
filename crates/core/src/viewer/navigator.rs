//! Cursor over a replayed history

use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

use crate::replay::{apply_san, fen_of, HistoryEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    White,
    Black,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::White => Orientation::Black,
            Orientation::Black => Orientation::White,
        }
    }
}

/// What the rendering surface needs to draw one position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub fen: String,
    pub orientation: Orientation,
    /// Applied move to highlight, `None` at the initial position
    pub last_move: Option<String>,
    pub last_move_uci: Option<String>,
    pub move_index: isize,
}

/// Position cursor; `-1` is the initial position.
#[derive(Debug, Clone)]
pub struct Navigator {
    history: Vec<HistoryEntry>,
    current: isize,
    position: Chess,
    orientation: Orientation,
}

impl Navigator {
    pub fn new(history: Vec<HistoryEntry>) -> Self {
        Self {
            history,
            current: -1,
            position: Chess::default(),
            orientation: Orientation::default(),
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn current_index(&self) -> isize {
        self.current
    }

    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        usize::try_from(self.current)
            .ok()
            .and_then(|i| self.history.get(i))
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn is_at_start(&self) -> bool {
        self.current == -1
    }

    pub fn is_at_end(&self) -> bool {
        self.current == self.last_index()
    }

    fn last_index(&self) -> isize {
        self.history.len() as isize - 1
    }

    /// Moves the cursor, replaying `history[0..=index]` from the start.
    /// Out-of-range indices are ignored and return `false`.
    pub fn go_to_move(&mut self, index: isize) -> bool {
        if index < -1 || index > self.last_index() {
            return false;
        }

        let mut position = Chess::default();
        let replayed = usize::try_from(index + 1).unwrap_or(0);
        for entry in &self.history[..replayed] {
            position = match apply_san(&position, &entry.san) {
                Ok(applied) => applied.position,
                Err(e) => match position_from_fen(&entry.fen) {
                    Some(snapshot) => {
                        tracing::debug!("Using stored position for {}: {}", entry.san, e);
                        snapshot
                    }
                    None => {
                        tracing::warn!("Cannot rebuild position at {}: {}", entry.san, e);
                        break;
                    }
                },
            };
        }

        self.position = position;
        self.current = index;
        true
    }

    pub fn go_to_first(&mut self) -> bool {
        self.go_to_move(-1)
    }

    pub fn go_to_last(&mut self) -> bool {
        self.go_to_move(self.last_index())
    }

    pub fn go_to_previous(&mut self) -> bool {
        self.go_to_move(self.current - 1)
    }

    pub fn go_to_next(&mut self) -> bool {
        self.go_to_move(self.current + 1)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn flip_board(&mut self) {
        self.orientation = self.orientation.flipped();
    }

    pub fn board_view(&self) -> BoardView {
        let entry = self.current_entry();
        BoardView {
            fen: fen_of(&self.position),
            orientation: self.orientation,
            last_move: entry.map(|e| e.san.clone()),
            last_move_uci: entry.map(|e| e.uci.clone()),
            move_index: self.current,
        }
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn position_from_fen(fen: &str) -> Option<Chess> {
    let fen: Fen = fen.parse().ok()?;
    fen.into_position(CastlingMode::Standard).ok()
}
