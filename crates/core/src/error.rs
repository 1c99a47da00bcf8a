//! Error types for chess-academy-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("PGN content is empty")]
    EmptyContent,

    #[error("PGN content is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Unsupported file type '{0}': only .pgn and .txt files are accepted")]
    UnsupportedExtension(String),

    #[error("No valid games found in PGN")]
    NoGamesFound,

    #[error("Game {index} does not exist ({count} games loaded)")]
    GameNotFound { index: usize, count: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
