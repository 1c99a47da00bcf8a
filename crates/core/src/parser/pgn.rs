//! Primary PGN parser
//!
//! Movetext is first checked against the PGN grammar, then handed to
//! `pgn-reader`, whose visitor builds the recursive move tree. Any grammar
//! violation rejects the whole text; recovery is the caller's job.

use pgn_reader::{Nag, Outcome, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use regex::Regex;
use std::borrow::Cow;
use std::io::Cursor;
use std::iter::Peekable;
use std::ops::ControlFlow;
use std::str::Chars;
use std::sync::LazyLock;
use thiserror::Error;

use super::headers::{HeaderValue, Headers};
use super::types::{GameRecord, MoveNode};

static TAG_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*[A-Za-z0-9_]+\s*"(?:[^"\\]|\\.)*"\s*$"#).expect("valid tag regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated comment starting on line {line}")]
    UnterminatedComment { line: usize },

    #[error("nested comment on line {line}")]
    NestedComment { line: usize },

    #[error("unbalanced variation parenthesis on line {line}")]
    UnbalancedVariation { line: usize },

    #[error("malformed tag on line {line}")]
    MalformedTag { line: usize },

    #[error("unexpected '{ch}' on line {line}")]
    UnexpectedCharacter { ch: char, line: usize },

    #[error("unrecognised token '{token}' on line {line}")]
    InvalidToken { token: String, line: usize },

    #[error("reader failure: {0}")]
    Reader(String),
}

/// Parses zero or more concatenated games.
pub fn parse_pgn_string(pgn: &str) -> Result<Vec<GameRecord>, ParseError> {
    let pgn = normalize_castling(strip_bom(pgn));
    let written = scan_movetext(&pgn)?;

    let mut parser = GameParser::new(written);
    let mut games = Vec::new();

    let cursor = Cursor::new(pgn.as_bytes());
    let mut reader = Reader::new(cursor);

    loop {
        match reader.read_game(&mut parser) {
            Ok(Some(game)) => games.push(game),
            Ok(None) => break,
            Err(e) => return Err(ParseError::Reader(e.to_string())),
        }
    }

    Ok(games)
}

// ---------------------------------------------------------------------------
// Grammar check
// ---------------------------------------------------------------------------

struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.next() {
            if c == '\n' {
                break;
            }
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | '[' | ']' | ';')
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Rejects text that a strict PGN grammar would not accept.
pub fn check_grammar(text: &str) -> Result<(), ParseError> {
    scan_movetext(&normalize_castling(strip_bom(text))).map(|_| ())
}

/// Grammar walk returning every move token as written, in document order.
fn scan_movetext(text: &str) -> Result<Vec<String>, ParseError> {
    let mut scanner = Scanner::new(text);
    let mut written = Vec::new();
    let mut depth = 0usize;
    let mut last_open_line = 1usize;
    let mut at_line_start = true;

    while let Some(c) = scanner.peek() {
        if c == '\n' {
            scanner.next();
            at_line_start = true;
            continue;
        }
        if c.is_whitespace() {
            scanner.next();
            continue;
        }

        let line = scanner.line;
        let line_start = std::mem::replace(&mut at_line_start, false);

        match c {
            '%' if line_start => {
                scanner.skip_line();
                at_line_start = true;
            }
            ';' => {
                scanner.skip_line();
                at_line_start = true;
            }
            '{' => {
                scanner.next();
                scan_comment(&mut scanner, line)?;
            }
            '[' => {
                scanner.next();
                scan_tag(&mut scanner, line)?;
            }
            '(' => {
                scanner.next();
                depth += 1;
                last_open_line = line;
            }
            ')' => {
                scanner.next();
                if depth == 0 {
                    return Err(ParseError::UnbalancedVariation { line });
                }
                depth -= 1;
            }
            '}' | ']' => return Err(ParseError::UnexpectedCharacter { ch: c, line }),
            _ => {
                let mut token = String::new();
                while let Some(c) = scanner.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    token.push(c);
                    scanner.next();
                }
                match classify_token(&token).map(MovetextToken::into_move) {
                    Some(Some(san)) => written.push(san),
                    Some(None) => {}
                    None => return Err(ParseError::InvalidToken { token, line }),
                }
            }
        }
    }

    if depth > 0 {
        return Err(ParseError::UnbalancedVariation {
            line: last_open_line,
        });
    }

    Ok(written)
}

fn scan_comment(scanner: &mut Scanner<'_>, start_line: usize) -> Result<(), ParseError> {
    loop {
        match scanner.next() {
            Some('}') => return Ok(()),
            Some('{') => {
                return Err(ParseError::NestedComment {
                    line: scanner.line,
                })
            }
            Some(_) => {}
            None => return Err(ParseError::UnterminatedComment { line: start_line }),
        }
    }
}

fn scan_tag(scanner: &mut Scanner<'_>, line: usize) -> Result<(), ParseError> {
    let mut body = String::new();
    let mut in_quotes = false;

    loop {
        let c = match scanner.next() {
            Some('\n') | None => return Err(ParseError::MalformedTag { line }),
            Some(c) => c,
        };

        match c {
            '\\' if in_quotes => {
                body.push(c);
                match scanner.next() {
                    Some('\n') | None => return Err(ParseError::MalformedTag { line }),
                    Some(escaped) => body.push(escaped),
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                body.push(c);
            }
            ']' if !in_quotes => break,
            _ => body.push(c),
        }
    }

    if TAG_BODY.is_match(&body) {
        Ok(())
    } else {
        Err(ParseError::MalformedTag { line })
    }
}

fn is_result(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}

fn is_san(token: &str) -> bool {
    let san = token.trim_end_matches(['!', '?']);
    !san.is_empty() && SanPlus::from_ascii(san.as_bytes()).is_ok()
}

enum MovetextToken<'a> {
    Move(&'a str),
    Marker,
}

impl MovetextToken<'_> {
    fn into_move(self) -> Option<String> {
        match self {
            MovetextToken::Move(san) => Some(san.to_string()),
            MovetextToken::Marker => None,
        }
    }
}

fn classify_token(token: &str) -> Option<MovetextToken<'_>> {
    if is_result(token) {
        return Some(MovetextToken::Marker);
    }
    if is_san(token) {
        return Some(MovetextToken::Move(token));
    }
    if let Some(digits) = token.strip_prefix('$') {
        let valid = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        return valid.then_some(MovetextToken::Marker);
    }
    if token.chars().all(|c| matches!(c, '!' | '?' | '.')) {
        return Some(MovetextToken::Marker);
    }

    // Move numbers, possibly glued to the move: "12.", "12...", "12.Nf3"
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == token.len() {
        return None;
    }
    let san = rest.trim_start_matches('.');
    if san.is_empty() {
        return Some(MovetextToken::Marker);
    }
    (san.len() < rest.len() && is_san(san)).then_some(MovetextToken::Move(san))
}

/// Rewrites castling written with zeros (`0-0`, `0-0-0`) to the letter form.
/// Comments and tags are copied untouched.
fn normalize_castling(text: &str) -> Cow<'_, str> {
    if !text.contains("0-0") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut token = String::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if !is_delimiter(c) {
            token.push(c);
            continue;
        }

        out.push_str(&castle_with_letters(&token));
        token.clear();
        out.push(c);

        match c {
            '{' => copy_through(&mut chars, &mut out, '}'),
            ';' => copy_through(&mut chars, &mut out, '\n'),
            '[' => {
                let mut in_quotes = false;
                let mut escaped = false;
                for c in chars.by_ref() {
                    out.push(c);
                    match c {
                        _ if escaped => escaped = false,
                        '\\' if in_quotes => escaped = true,
                        '"' => in_quotes = !in_quotes,
                        ']' if !in_quotes => break,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    out.push_str(&castle_with_letters(&token));

    Cow::Owned(out)
}

fn copy_through(chars: &mut Chars<'_>, out: &mut String, end: char) {
    for c in chars.by_ref() {
        out.push(c);
        if c == end {
            break;
        }
    }
}

fn castle_with_letters(token: &str) -> Cow<'_, str> {
    let number_len = match token.find(|c: char| !c.is_ascii_digit()) {
        Some(i) if i > 0 && token[i..].starts_with('.') => {
            token.len() - token[i..].trim_start_matches('.').len()
        }
        _ => 0,
    };
    let (number, rest) = token.split_at(number_len);
    let body = rest.trim_end_matches(['+', '#', '!', '?']);
    let suffix = &rest[body.len()..];

    let castle = match body {
        "0-0" => "O-O",
        "0-0-0" => "O-O-O",
        _ => return Cow::Borrowed(token),
    };
    Cow::Owned(format!("{number}{castle}{suffix}"))
}

// ---------------------------------------------------------------------------
// Tree-building visitor
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GameTags {
    headers: Headers,
}

#[derive(Default)]
struct Line {
    moves: Vec<MoveNode>,
    /// Comments seen before the first move of the line
    pending_comments: Vec<String>,
}

struct GameMoves {
    headers: Headers,
    root: Line,
    /// Variations currently open, innermost last
    open: Vec<Line>,
    outcome: Option<String>,
}

impl GameMoves {
    fn current_line(&mut self) -> &mut Line {
        match self.open.last_mut() {
            Some(line) => line,
            None => &mut self.root,
        }
    }

    fn close_variation(&mut self) {
        let Some(line) = self.open.pop() else {
            return;
        };
        if line.moves.is_empty() {
            return;
        }
        match self.current_line().moves.last_mut() {
            Some(parent) => parent.variations.push(line.moves),
            None => tracing::debug!("Dropping variation that precedes any move"),
        }
    }
}

/// Builds move trees, labelling each move with its token as written.
struct GameParser {
    written: Vec<String>,
    next: usize,
}

impl GameParser {
    fn new(written: Vec<String>) -> Self {
        Self { written, next: 0 }
    }

    /// The recorded source token for `san`, or its canonical form when the
    /// next recorded token reads as a different move.
    fn notation_for(&mut self, san: &SanPlus) -> String {
        match self.written.get(self.next) {
            Some(token) if reads_as(token, san) => {
                self.next += 1;
                token.clone()
            }
            _ => san.to_string(),
        }
    }
}

fn reads_as(token: &str, san: &SanPlus) -> bool {
    let stripped = token.trim_end_matches(['!', '?']);
    SanPlus::from_ascii(stripped.as_bytes()).is_ok_and(|parsed| parsed == *san)
}

impl Visitor for GameParser {
    type Tags = GameTags;
    type Movetext = GameMoves;
    type Output = GameRecord;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name = String::from_utf8_lossy(name).into_owned();
        if !tags.headers.contains(&name) {
            let value = value.decode_utf8_lossy().to_string();
            let parsed = HeaderValue::from_tag(&name, value);
            tags.headers.insert_value(name, parsed);
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(GameMoves {
            headers: tags.headers,
            root: Line::default(),
            open: Vec::new(),
            outcome: None,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        let notation = self.notation_for(&san);
        let line = movetext.current_line();
        let mut node = MoveNode::new(notation);
        node.comments_before = std::mem::take(&mut line.pending_comments);
        line.moves.push(node);
        ControlFlow::Continue(())
    }

    fn nag(&mut self, movetext: &mut Self::Movetext, nag: Nag) -> ControlFlow<Self::Output> {
        if let Some(node) = movetext.current_line().moves.last_mut() {
            node.nags.push(nag.0);
        }
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes()).trim().to_string();
        if text.is_empty() {
            return ControlFlow::Continue(());
        }

        let line = movetext.current_line();
        match line.moves.last_mut() {
            Some(node) => node.comments_after.push(text),
            None => line.pending_comments.push(text),
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        movetext.open.push(Line::default());
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, movetext: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        movetext.close_variation();
        ControlFlow::Continue(())
    }

    fn outcome(
        &mut self,
        movetext: &mut Self::Movetext,
        outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        movetext.outcome = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, mut movetext: Self::Movetext) -> Self::Output {
        while !movetext.open.is_empty() {
            movetext.close_variation();
        }

        let mut headers = movetext.headers;
        if let Some(outcome) = movetext.outcome {
            if !headers.contains("Result") {
                headers.insert("Result", outcome);
            }
        }

        let moves = movetext.root.moves;
        GameRecord {
            headers,
            move_count: moves.len(),
            moves,
            is_manually_parsed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PGN: &str = r#"[Event "Test"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 1-0
"#;

    #[test]
    fn test_parse_pgn_string() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        assert_eq!(games.len(), 1);

        let game = &games[0];
        assert_eq!(game.white(), Some("Alice"));
        assert_eq!(game.black(), Some("Bob"));
        assert_eq!(game.result(), Some("1-0"));
        assert_eq!(game.move_count, 5);
        assert!(!game.is_manually_parsed);
        assert_eq!(game.moves[4].notation, "Bb5");
    }

    #[test]
    fn test_game_summary() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        assert_eq!(games[0].summary(), "Alice vs Bob - 1-0");
    }

    #[test]
    fn test_comments_and_nags_attach_to_moves() {
        let pgn = r#"[Event "Annotated"]

{ A quiet start } 1. e4 $1 { Best by test } { really } e5 $2 $6 *"#;
        let games = parse_pgn_string(pgn).unwrap();
        let moves = &games[0].moves;

        assert_eq!(moves[0].comments_before, vec!["A quiet start"]);
        assert_eq!(moves[0].comments_after, vec!["Best by test", "really"]);
        assert_eq!(moves[0].nags, vec![1]);
        assert_eq!(moves[1].nags, vec![2, 6]);
        assert_eq!(
            moves[0].comment_text().as_deref(),
            Some("A quiet start Best by test really")
        );
    }

    #[test]
    fn test_variations_branch_at_replaced_move() {
        let pgn = r#"[Event "Lines"]

1. e4 e5 (1... c5 2. Nf3 (2. c3 d5) d6) 2. Nf3 *"#;
        let games = parse_pgn_string(pgn).unwrap();
        let moves = &games[0].moves;

        assert_eq!(games[0].move_count, 3);
        assert_eq!(moves[1].notation, "e5");
        assert_eq!(moves[1].variations.len(), 1);

        let sicilian = &moves[1].variations[0];
        let notations: Vec<_> = sicilian.iter().map(|m| m.notation.as_str()).collect();
        assert_eq!(notations, vec!["c5", "Nf3", "d6"]);
        assert_eq!(sicilian[1].variations.len(), 1);
        assert_eq!(sicilian[1].variations[0][0].notation, "c3");
    }

    #[test]
    fn test_duplicate_tags_keep_first_value() {
        let pgn = r#"[Event "First"]
[Event "Second"]

1. d4 *"#;
        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games[0].event(), Some("First"));
    }

    #[test]
    fn test_result_taken_from_movetext_when_tag_missing() {
        let pgn = "[Event \"No result tag\"]\n\n1. e4 e5 0-1";
        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games[0].result(), Some("0-1"));
    }

    #[test]
    fn test_date_header_is_normalized() {
        let pgn = "[Event \"Dated\"]\n[Date \"2021.??.??\"]\n\n1. e4 *";
        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games[0].header("Date"), Some("2021.??.??"));
    }

    #[test]
    fn test_game_without_event_is_still_emitted() {
        let games = parse_pgn_string("[White \"A\"]\n\n1. e4 *").unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].event(), None);
    }

    #[test]
    fn test_two_games() {
        let pgn = "[Event \"One\"]\n\n1. e4 *\n\n[Event \"Two\"]\n\n1. d4 d5 *\n";
        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].move_count, 1);
        assert_eq!(games[1].move_count, 2);
        assert_eq!(games[1].event(), Some("Two"));
    }

    #[test]
    fn test_unterminated_comment_is_rejected() {
        let pgn = "[Event \"Broken\"]\n\n1. e4 { never closed e5 2. Nf3 *";
        assert_eq!(
            parse_pgn_string(pgn),
            Err(ParseError::UnterminatedComment { line: 3 })
        );
    }

    #[test]
    fn test_nested_comment_is_rejected() {
        let pgn = "[Event \"Nested\"]\n\n1. e4 { outer { inner } } e5 *";
        assert!(matches!(
            parse_pgn_string(pgn),
            Err(ParseError::NestedComment { .. })
        ));
    }

    #[test]
    fn test_unbalanced_variations_are_rejected() {
        assert!(matches!(
            check_grammar("1. e4 (1. d4 d5 *"),
            Err(ParseError::UnbalancedVariation { line: 1 })
        ));
        assert!(matches!(
            check_grammar("1. e4 ) e5 *"),
            Err(ParseError::UnbalancedVariation { .. })
        ));
    }

    #[test]
    fn test_malformed_tag_is_rejected() {
        assert!(matches!(
            check_grammar("[Event Missing quotes]\n\n1. e4 *"),
            Err(ParseError::MalformedTag { line: 1 })
        ));
        assert!(matches!(
            check_grammar("[Event \"unterminated\n\n1. e4 *"),
            Err(ParseError::MalformedTag { .. })
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let err = check_grammar("[Event \"x\"]\n\n1. e4 hello e5 *").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidToken {
                token: "hello".to_string(),
                line: 3
            }
        );
    }

    #[test]
    fn test_grammar_accepts_common_movetext() {
        let text = "[Event \"a \\\"quoted\\\" name\"]\n\
                    % escaped line\n\
                    1.e4 e5!? 2. Nf3 Nc6 ; rest of line\n\
                    3. Bb5 a6?! 4. O-O O-O-O 5. exd8=Q+ Kxd8 $14 6... Ke7# 1/2-1/2";
        assert_eq!(check_grammar(text), Ok(()));
    }

    #[test]
    fn test_leading_byte_order_mark_is_ignored() {
        let pgn = "\u{feff}[Event \"Bom\"]\n[White \"A\"]\n\n1. e4 e5 *";
        assert_eq!(check_grammar(pgn), Ok(()));

        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].event(), Some("Bom"));
        assert_eq!(games[0].move_count, 2);
    }

    #[test]
    fn test_castling_written_with_zeros() {
        let pgn = "[Event \"Zeros\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 Nf6 *";
        let games = parse_pgn_string(pgn).unwrap();
        assert_eq!(games[0].move_count, 8);
        assert_eq!(games[0].moves[6].notation, "O-O");
    }

    #[test]
    fn test_castling_rewrite_skips_comments_and_results() {
        assert_eq!(
            normalize_castling("1. e4 { 0-0 later } e5 ; 0-0\n0-1"),
            "1. e4 { 0-0 later } e5 ; 0-0\n0-1"
        );
        assert_eq!(
            normalize_castling("[Event \"0-0\"] 4.0-0+ 0-0-0! 1-0"),
            "[Event \"0-0\"] 4.O-O+ O-O-O! 1-0"
        );
    }

    #[test]
    fn test_notation_keeps_source_suffixes() {
        let pgn = "[Event \"Marks\"]\n\n1. e4!? e5 2.Nf3?! Nc6 *";
        let games = parse_pgn_string(pgn).unwrap();
        let notations: Vec<_> = games[0].moves.iter().map(|m| m.notation.as_str()).collect();
        assert_eq!(notations, vec!["e4!?", "e5", "Nf3?!", "Nc6"]);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let pgn = "[Event \"Same\"]\n\n1. e4 {c} (1. d4) e5 2. Nf3 *";
        assert_eq!(parse_pgn_string(pgn), parse_pgn_string(pgn));
    }

    #[test]
    fn test_empty_text_yields_no_games() {
        assert_eq!(parse_pgn_string("   \n"), Ok(Vec::new()));
    }
}
