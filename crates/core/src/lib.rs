//! Chess Academy Core Library
//!
//! PGN ingestion (strict parser with a header-only fallback), validation,
//! move tree replay and a navigable game viewer with autoplay.

pub mod config;
pub mod error;
pub mod ingest;
pub mod parser;
pub mod replay;
pub mod validation;
pub mod viewer;

pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{parse_with_fallback, prepare_upload, read_pgn_file, UploadPayload};
pub use parser::{parse_manual, parse_pgn_string, GameRecord, Headers, MoveNode, ParseError};
pub use replay::{HistoryEntry, Replayer};
pub use validation::{validate, GameMetadata, GameValidation, ValidationReport};
pub use viewer::{BoardView, GameViewer, Navigator, Orientation};
