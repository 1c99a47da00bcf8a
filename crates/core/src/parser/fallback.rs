//! Fallback PGN parser
//!
//! Recovers headers with plain pattern matching when the grammar-checked
//! parser rejects a text. Moves are never reconstructed; only an estimate
//! of the move count is kept.

use regex::Regex;
use std::sync::LazyLock;

use super::headers::Headers;
use super::types::{
    GameRecord, UNKNOWN_DATE, UNKNOWN_EVENT, UNKNOWN_FIELD, UNKNOWN_PLAYER, UNKNOWN_RESULT,
};

const SAN: &str = r"(?:O-O-O|O-O|0-0-0|0-0|[KQRBN][a-h]?[1-8]?x?[a-h][1-8]|[a-h](?:x[a-h])?[1-8](?:=[QRBN])?)[+#]?";

/// The seven tag roster keys, in output order, with their placeholders
const CANONICAL_TAGS: [(&str, &str); 7] = [
    ("Event", UNKNOWN_EVENT),
    ("White", UNKNOWN_PLAYER),
    ("Black", UNKNOWN_PLAYER),
    ("Date", UNKNOWN_DATE),
    ("Result", UNKNOWN_RESULT),
    ("Site", UNKNOWN_FIELD),
    ("Round", UNKNOWN_FIELD),
];

static EVENT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[Event\s+"[^"]*"\s*\]"#).expect("valid event tag regex")
});
static TAG_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[([^\[\]"]+)"([^"]*)"\s*\]"#).expect("valid tag pair regex")
});
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]]*\]").expect("valid tag regex"));
static NAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").expect("valid NAG regex"));
static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]+").expect("valid suffix regex"));
static NUMBERED_MOVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\d+\.{{1,3}}\s*({SAN})")).expect("valid numbered move regex")
});
static BARE_SAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{SAN}$")).expect("valid SAN regex"));
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid token regex"));
static SQUARE_OR_CASTLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-h][1-8]|O-O(?:-O)?").expect("valid square regex"));

/// Parses every segment that carries an `Event` tag.
///
/// All records come back with `is_manually_parsed` set and no moves.
pub fn parse_manual(text: &str) -> Vec<GameRecord> {
    split_games(text)
        .into_iter()
        .filter_map(build_record)
        .collect()
}

/// Splits the text at each `[Event "..."]` tag.
///
/// With zero or one such tag the whole text is a single segment.
pub fn split_games(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = EVENT_TAG.find_iter(text).map(|m| m.start()).collect();
    if starts.len() <= 1 {
        return vec![text];
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

/// Every well-formed `[Key "Value"]` pair, first occurrence of a key wins
pub fn extract_tags(segment: &str) -> Vec<(String, String)> {
    let mut tags: Vec<(String, String)> = Vec::new();
    for cap in TAG_PAIR.captures_iter(segment) {
        let key = cap[1].trim();
        if key.is_empty() || tags.iter().any(|(k, _)| k == key) {
            continue;
        }
        tags.push((key.to_string(), cap[2].to_string()));
    }
    tags
}

/// Best-effort move count, no legality checking involved.
pub fn estimate_move_count(segment: &str) -> usize {
    let cleaned = clean_movetext(segment);

    let counted = count_san_tokens(&cleaned);
    if counted > 0 {
        return counted;
    }

    if cleaned.trim().len() > 20 {
        let hits = SQUARE_OR_CASTLE.find_iter(&cleaned).count();
        return (hits / 2).max(1);
    }

    0
}

fn build_record(segment: &str) -> Option<GameRecord> {
    let tags = extract_tags(segment);
    if !tags.iter().any(|(key, _)| key == "Event") {
        tracing::debug!("Discarding segment without an Event tag");
        return None;
    }

    let mut headers = Headers::new();
    for (key, placeholder) in CANONICAL_TAGS {
        let value = tags
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .unwrap_or(placeholder);
        headers.insert(key, value);
    }
    for (key, value) in tags {
        if !headers.contains(&key) {
            headers.insert(key, value);
        }
    }

    Some(GameRecord {
        headers,
        moves: Vec::new(),
        move_count: estimate_move_count(segment),
        is_manually_parsed: true,
    })
}

fn clean_movetext(segment: &str) -> String {
    let without_tags = ANY_TAG.replace_all(segment, " ");
    let without_comments = strip_nested(&without_tags, '{', '}');
    let without_variations = strip_nested(&without_comments, '(', ')');
    let without_nags = NAG.replace_all(&without_variations, " ");
    SUFFIX.replace_all(&without_nags, "").into_owned()
}

/// Removes `open ... close` spans by depth counting. An unclosed span runs
/// to the end of the text; a stray `close` is dropped.
fn strip_nested(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;

    for c in text.chars() {
        if c == open {
            if depth == 0 {
                out.push(' ');
            }
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(c);
        }
    }

    out
}

/// Numbered moves (`12. Nf3`, `12...Nf6`) plus bare SAN tokens not already
/// counted as part of a numbered move.
fn count_san_tokens(cleaned: &str) -> usize {
    let numbered: Vec<(usize, usize)> = NUMBERED_MOVE
        .captures_iter(cleaned)
        .filter_map(|cap| cap.get(1))
        .map(|m| (m.start(), m.end()))
        .collect();

    let bare = TOKEN
        .find_iter(cleaned)
        .filter(|token| BARE_SAN.is_match(token.as_str()))
        .filter(|token| {
            !numbered
                .iter()
                .any(|&(start, end)| token.start() < end && start < token.end())
        })
        .count();

    numbered.len() + bare
}
