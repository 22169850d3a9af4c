//! Plain-text game format consumed by the analyser.
//!
//! ```text
//! [Event "Club"]
//! [White "Alice"]
//!
//! e2e4 e7e5 g1f3 1-0
//! ```

use thiserror::Error;

use crate::game::Game;

/// Errors converting a game to or from the analyser text format.
#[derive(Error, Debug, PartialEq)]
pub enum ConversionError {
    /// A move identifier is empty or contains whitespace.
    #[error("Invalid move identifier at ply {ply}: {token:?}")]
    InvalidMove { ply: usize, token: String },
    /// A header line is not of the form `[Key "Value"]`.
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),
}

/// Serialize a game's headers and main line.
///
/// # Errors
///
/// Returns [`ConversionError::InvalidMove`] for move identifiers that
/// would not survive a whitespace split.
pub fn to_uci_text(game: &Game) -> Result<String, ConversionError> {
    let mut text = String::new();

    for (key, value) in &game.headers {
        text.push_str(&format!("[{} \"{}\"]\n", key, escape(value)));
    }
    text.push('\n');

    for (i, mv) in game.moves.iter().enumerate() {
        if mv.is_empty() || mv.chars().any(char::is_whitespace) {
            return Err(ConversionError::InvalidMove {
                ply: i + 1,
                token: mv.clone(),
            });
        }
        text.push_str(mv);
        text.push(' ');
    }
    text.push_str(game.result().unwrap_or(""));
    text.push('\n');

    Ok(text)
}

/// A game read back from the analyser text format.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UciGame {
    pub headers: Vec<(String, String)>,
    pub moves: Vec<String>,
    /// Trailing result token (`1-0`, `0-1`, `1/2-1/2`, `*`), if present.
    pub result: Option<String>,
}

const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Parse the analyser text format.
///
/// Header lines run until the first blank line; every whitespace-separated
/// token after it is a move, except a final result token.
pub fn parse_uci_text(text: &str) -> Result<UciGame, ConversionError> {
    let mut game = UciGame::default();
    let mut lines = text.lines();

    for line in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() {
            if game.headers.is_empty() {
                continue;
            }
            break;
        }
        if !line.starts_with('[') {
            // No header section at all.
            game.moves
                .extend(line.split_whitespace().map(str::to_string));
            break;
        }
        game.headers.push(parse_header(line)?);
    }

    for token in lines.flat_map(str::split_whitespace) {
        game.moves.push(token.to_string());
    }
    if let Some(last) = game.moves.last() {
        if RESULT_TOKENS.contains(&last.as_str()) {
            game.result = game.moves.pop();
        }
    }

    Ok(game)
}

fn parse_header(line: &str) -> Result<(String, String), ConversionError> {
    let malformed = || ConversionError::MalformedHeader(line.to_string());

    let inner = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(malformed)?;
    let (key, quoted) = inner.split_once(' ').ok_or_else(malformed)?;
    let value = quoted
        .trim()
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(malformed)?;

    Ok((key.to_string(), unescape(value)))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_game() -> Game {
        Game::new(
            vec![
                ("Event".to_string(), "Club \"Open\"".to_string()),
                ("White".to_string(), "Alice".to_string()),
                ("Black".to_string(), "Bob".to_string()),
                ("Result".to_string(), "1-0".to_string()),
            ],
            vec!["e2e4".to_string(), "e7e5".to_string(), "g1f3".to_string()],
        )
    }

    #[test]
    fn test_to_uci_text_layout() {
        let text = to_uci_text(&sample_game()).unwrap();
        assert_eq!(
            text,
            "[Event \"Club \\\"Open\\\"\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"1-0\"]\n\ne2e4 e7e5 g1f3 1-0\n"
        );
    }

    #[test]
    fn test_round_trip_headers_and_moves() {
        let game = sample_game();
        let parsed = parse_uci_text(&to_uci_text(&game).unwrap()).unwrap();
        assert_eq!(parsed.headers, game.headers);
        assert_eq!(parsed.moves, game.moves);
        assert_eq!(parsed.result.as_deref(), Some("1-0"));
    }

    #[test]
    fn test_game_without_result_header() {
        let game = Game::new(vec![], vec!["d2d4".to_string()]);
        let text = to_uci_text(&game).unwrap();
        assert_eq!(text, "\nd2d4 \n");
        let parsed = parse_uci_text(&text).unwrap();
        assert_eq!(parsed.moves, vec!["d2d4"]);
        assert_eq!(parsed.result, None);
    }

    #[test]
    fn test_rejects_moves_with_whitespace() {
        let game = Game::new(vec![], vec!["e2e4".to_string(), "e7 e5".to_string()]);
        assert_eq!(
            to_uci_text(&game),
            Err(ConversionError::InvalidMove {
                ply: 2,
                token: "e7 e5".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let err = parse_uci_text("[White Alice]\n\ne2e4\n").unwrap_err();
        assert_eq!(err, ConversionError::MalformedHeader("[White Alice]".to_string()));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            headers in proptest::collection::vec(("[A-Za-z]{1,10}", "[ -~]{0,20}"), 0..8),
            moves in proptest::collection::vec("[a-h][1-8][a-h][1-8][qrbn]?", 0..40),
        ) {
            prop_assume!(!headers.iter().any(|(k, _)| k == "Result"));
            let game = Game::new(headers.clone(), moves.clone());
            let parsed = parse_uci_text(&to_uci_text(&game).unwrap()).unwrap();
            prop_assert_eq!(parsed.headers, headers);
            prop_assert_eq!(parsed.moves, moves);
        }
    }
}
