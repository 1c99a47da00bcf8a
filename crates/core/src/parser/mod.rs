//! Parser module for PGN text
//!
//! - `pgn`: grammar-checked parser producing full move trees
//! - `fallback`: pattern-matching parser recovering headers only

pub mod fallback;
pub mod headers;
pub mod pgn;
pub mod types;

// Re-export commonly used items for convenience
pub use fallback::parse_manual;
pub use headers::{HeaderValue, Headers};
pub use pgn::{parse_pgn_string, ParseError};
pub use types::{GameRecord, MoveNode};
