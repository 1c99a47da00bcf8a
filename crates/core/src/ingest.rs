//! Upload pipeline: input checks, parsing with fallback, validation
//!
//! Produces the payload handed to the backend upload endpoint: the raw
//! text, the parsed games and the validation summary.

use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::{parse_manual, parse_pgn_string, GameRecord};
use crate::validation::{validate, GameMetadata, GameValidation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub games: Vec<GameRecord>,
    pub used_fallback: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub raw: String,
    pub games: Vec<GameRecord>,
    pub validations: Vec<GameValidation>,
    pub metadata: GameMetadata,
    pub warnings: Vec<String>,
    pub used_fallback: bool,
}

/// Rejects file names whose extension is not allowed.
pub fn check_file_name(name: &str, config: &Config) -> Result<()> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    if config.is_allowed_extension(extension) {
        Ok(())
    } else {
        Err(Error::UnsupportedExtension(name.to_string()))
    }
}

/// Rejects empty or oversized content before any parser runs.
pub fn check_content(text: &str, config: &Config) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::EmptyContent);
    }
    check_size(text.len() as u64, config)
}

fn check_size(size: u64, config: &Config) -> Result<()> {
    if size > config.max_upload_bytes {
        return Err(Error::TooLarge {
            size,
            limit: config.max_upload_bytes,
        });
    }
    Ok(())
}

/// Runs the grammar-checked parser, falling back to header recovery when it
/// fails or finds nothing.
pub fn parse_with_fallback(text: &str) -> Result<ParseOutcome> {
    if text.trim().is_empty() {
        return Err(Error::EmptyContent);
    }

    let reason = match parse_pgn_string(text) {
        Ok(games) if !games.is_empty() => {
            return Ok(ParseOutcome {
                games,
                used_fallback: false,
                warnings: Vec::new(),
            });
        }
        Ok(_) => "no games recognised".to_string(),
        Err(e) => e.to_string(),
    };

    tracing::warn!("Standard PGN parsing failed ({}), using fallback parser", reason);

    let games = parse_manual(text);
    if games.is_empty() {
        return Err(Error::NoGamesFound);
    }

    let warning = format!(
        "Standard PGN parsing failed ({}); {} game(s) recovered with the fallback parser, move lists are unavailable",
        reason,
        games.len()
    );

    Ok(ParseOutcome {
        games,
        used_fallback: true,
        warnings: vec![warning],
    })
}

/// Checks, parses and validates `text` into an upload payload.
pub fn prepare_upload(text: String, config: &Config) -> Result<UploadPayload> {
    check_content(&text, config)?;

    let outcome = parse_with_fallback(&text)?;
    let report = validate(&outcome.games, &text);

    tracing::info!(
        "Parsed {} games ({} valid, fallback: {})",
        report.metadata.total_games,
        report.metadata.valid_games,
        outcome.used_fallback
    );

    Ok(UploadPayload {
        raw: text,
        games: outcome.games,
        validations: report.validations,
        metadata: report.metadata,
        warnings: outcome.warnings,
        used_fallback: outcome.used_fallback,
    })
}

/// Reads a user-selected PGN file, enforcing extension and size limits.
pub async fn read_pgn_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<String> {
    let path = path.as_ref();
    check_file_name(&path.to_string_lossy(), config)?;

    let metadata = tokio::fs::metadata(path).await?;
    check_size(metadata.len(), config)?;

    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
