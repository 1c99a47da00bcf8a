//! Validation result types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verdict for one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameValidation {
    pub is_valid: bool,
    pub has_valid_players: bool,
    pub has_moves: bool,
    /// Fatal reasons
    pub errors: Vec<String>,
    /// Non-fatal reasons
    pub warnings: Vec<String>,
}

impl GameValidation {
    /// Verdict for a game that could not be inspected at all
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            errors: vec![reason.into()],
            ..Self::default()
        }
    }
}

/// Batch-level counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    pub total_games: usize,
    pub valid_games: usize,
    pub games_with_errors: usize,
    /// Byte length of the source text
    pub estimated_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validations: Vec<GameValidation>,
    pub metadata: GameMetadata,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty header name")]
    EmptyHeaderName,

    #[error("malformed header name '{0}'")]
    MalformedHeaderName(String),
}
