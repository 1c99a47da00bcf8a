//! Replaying parsed move trees on a rules-aware board

mod history;

pub use history::{apply_san, fen_of, AppliedMove, HistoryEntry, ReplayError, Replayer};
