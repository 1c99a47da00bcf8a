//! Parsed game records and the recursive move tree

use serde::{Deserialize, Serialize};

use super::headers::Headers;

/// Header placeholders used when a tag could not be recovered
pub const UNKNOWN_EVENT: &str = "Unknown Event";
pub const UNKNOWN_PLAYER: &str = "Unknown";
pub const UNKNOWN_DATE: &str = "????.??.??";
pub const UNKNOWN_RESULT: &str = "*";
pub const UNKNOWN_FIELD: &str = "?";

/// One ply of a move tree, with its annotations and side variations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveNode {
    /// Move as written in the source text, annotation suffixes included;
    /// castling written with zeros reads as `O-O`
    pub notation: String,
    /// Comments that open a line, before its first move
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments_before: Vec<String>,
    #[serde(default)]
    pub comments_after: Vec<String>,
    /// Numeric annotation glyphs, `$1` is stored as `1`
    #[serde(default)]
    pub nags: Vec<u8>,
    /// Alternatives to this move, each a line starting from the position before it
    #[serde(default)]
    pub variations: Vec<Vec<MoveNode>>,
}

impl MoveNode {
    pub fn new(notation: impl Into<String>) -> Self {
        Self {
            notation: notation.into(),
            ..Self::default()
        }
    }

    /// All comments of this ply joined with a single space
    pub fn comment_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .comments_before
            .iter()
            .chain(self.comments_after.iter())
            .map(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// One parsed chess game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub headers: Headers,
    #[serde(default)]
    pub moves: Vec<MoveNode>,
    /// Main-line length, or an estimate when the game was parsed manually
    #[serde(default)]
    pub move_count: usize,
    /// Set by the fallback parser; `moves` is always empty in that case
    #[serde(default)]
    pub is_manually_parsed: bool,
}

impl GameRecord {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn event(&self) -> Option<&str> {
        self.header("Event")
    }

    pub fn white(&self) -> Option<&str> {
        self.header("White")
    }

    pub fn black(&self) -> Option<&str> {
        self.header("Black")
    }

    pub fn result(&self) -> Option<&str> {
        self.header("Result")
    }

    pub fn summary(&self) -> String {
        let white = self.white().unwrap_or(UNKNOWN_PLAYER);
        let black = self.black().unwrap_or(UNKNOWN_PLAYER);
        let result = self.result().unwrap_or(UNKNOWN_RESULT);
        format!("{} vs {} - {}", white, black, result)
    }
}
