//! Validity rules for parsed games

use super::types::*;
use crate::parser::types::{UNKNOWN_EVENT, UNKNOWN_PLAYER};
use crate::parser::GameRecord;

const FALLBACK_WARNING: &str =
    "Parsed with the fallback parser: headers only, move list unavailable";

/// Validates every game; a game that cannot be inspected is marked invalid
/// and the batch carries on.
pub fn validate(games: &[GameRecord], source: &str) -> ValidationReport {
    let validations: Vec<GameValidation> = games
        .iter()
        .enumerate()
        .map(|(index, game)| {
            validate_game(game).unwrap_or_else(|e| {
                tracing::warn!("Validation of game {} failed: {}", index + 1, e);
                GameValidation::failed(format!("Validation failed: {}", e))
            })
        })
        .collect();

    let total_games = validations.len();
    let games_with_errors = validations.iter().filter(|v| !v.is_valid).count();

    ValidationReport {
        validations,
        metadata: GameMetadata {
            total_games,
            valid_games: total_games - games_with_errors,
            games_with_errors,
            estimated_size: source.len(),
        },
    }
}

pub fn validate_game(game: &GameRecord) -> Result<GameValidation, ValidationError> {
    check_header_names(game)?;

    let has_event = is_known(game.event(), UNKNOWN_EVENT);
    let has_white = is_known(game.white(), UNKNOWN_PLAYER);
    let has_black = is_known(game.black(), UNKNOWN_PLAYER);
    let has_moves = !game.moves.is_empty() || game.move_count > 0;
    let has_valid_players = has_white || has_black;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !has_event {
        errors.push("Missing Event header".to_string());
    }
    if !has_moves {
        errors.push("No moves found".to_string());
    }
    if !has_white {
        warnings.push("Missing White player".to_string());
    }
    if !has_black {
        warnings.push("Missing Black player".to_string());
    }
    if game.is_manually_parsed {
        warnings.push(FALLBACK_WARNING.to_string());
        if game.move_count > 0 {
            warnings.push(format!("Move count of {} is an estimate", game.move_count));
        }
    }

    Ok(GameValidation {
        is_valid: has_event && has_valid_players && has_moves,
        has_valid_players,
        has_moves,
        errors,
        warnings,
    })
}

fn is_known(value: Option<&str>, placeholder: &str) -> bool {
    match value {
        Some(v) => {
            let v = v.trim();
            !v.is_empty() && v != placeholder
        }
        None => false,
    }
}

fn check_header_names(game: &GameRecord) -> Result<(), ValidationError> {
    for name in game.headers.keys() {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyHeaderName);
        }
        if name.contains(['[', ']', '"']) || name.chars().any(char::is_control) {
            return Err(ValidationError::MalformedHeaderName(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{GameRecord, Headers, MoveNode};

    fn game(tags: &[(&str, &str)], moves: &[&str]) -> GameRecord {
        let moves: Vec<MoveNode> = moves.iter().map(|m| MoveNode::new(*m)).collect();
        GameRecord {
            headers: tags.iter().copied().collect::<Headers>(),
            move_count: moves.len(),
            moves,
            is_manually_parsed: false,
        }
    }

    #[test]
    fn test_complete_game_is_valid() {
        let g = game(&[("Event", "Club"), ("White", "A"), ("Black", "B")], &["e4"]);
        let v = validate_game(&g).unwrap();
        assert!(v.is_valid);
        assert!(v.has_valid_players);
        assert!(v.errors.is_empty());
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn test_placeholder_event_is_an_error() {
        let g = game(&[("Event", "Unknown Event"), ("White", "A")], &["e4"]);
        let v = validate_game(&g).unwrap();
        assert!(!v.is_valid);
        assert_eq!(v.errors, vec!["Missing Event header"]);
        assert_eq!(v.warnings, vec!["Missing Black player"]);
    }

    #[test]
    fn test_one_player_is_enough() {
        let g = game(&[("Event", "Club"), ("Black", "B"), ("White", "Unknown")], &["e4"]);
        let v = validate_game(&g).unwrap();
        assert!(v.is_valid);
        assert_eq!(v.warnings, vec!["Missing White player"]);
    }

    #[test]
    fn test_no_players_is_invalid_without_errors() {
        let g = game(&[("Event", "Club")], &["e4"]);
        let v = validate_game(&g).unwrap();
        assert!(!v.is_valid);
        assert!(!v.has_valid_players);
        assert!(v.errors.is_empty());
        assert_eq!(v.warnings.len(), 2);
    }

    #[test]
    fn test_missing_moves_is_an_error() {
        let g = game(&[("Event", "Club"), ("White", "A")], &[]);
        let v = validate_game(&g).unwrap();
        assert!(!v.is_valid);
        assert!(!v.has_moves);
        assert_eq!(v.errors, vec!["No moves found"]);
    }

    #[test]
    fn test_fallback_game_counts_estimate_and_only_warns() {
        let mut g = game(&[("Event", "Club"), ("White", "A"), ("Black", "B")], &[]);
        g.is_manually_parsed = true;
        g.move_count = 12;
        let v = validate_game(&g).unwrap();
        assert!(v.is_valid);
        assert!(v.errors.is_empty());
        assert_eq!(v.warnings.len(), 2);
        assert!(v.warnings[1].contains("12"));
    }

    #[test]
    fn test_bad_game_does_not_abort_batch() {
        let good = game(&[("Event", "Club"), ("White", "A")], &["e4"]);
        let bad = game(&[("Event", "Club"), ("", "oops")], &["e4"]);
        let report = validate(&[good, bad], "0123456789");

        assert!(report.validations[0].is_valid);
        assert!(!report.validations[1].is_valid);
        assert_eq!(
            report.validations[1].errors,
            vec!["Validation failed: empty header name"]
        );
        assert_eq!(report.metadata.total_games, 2);
        assert_eq!(report.metadata.valid_games, 1);
        assert_eq!(report.metadata.games_with_errors, 1);
        assert_eq!(report.metadata.estimated_size, 10);
    }

    #[test]
    fn test_empty_batch() {
        let report = validate(&[], "");
        assert_eq!(report.metadata, GameMetadata::default());
    }
}
