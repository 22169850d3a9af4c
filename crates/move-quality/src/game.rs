//! Game records and PGN loading.
//!
//! Games are read with `pgn-reader`; SAN tokens are resolved against a running
//! `shakmaty` position so that every stored move is a UCI identifier
//! (e.g. `e2e4`, `e1g1`, `e7e8q`). Only the main line is kept.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{Outcome, RawTag, Reader, SanPlus, Skip, Visitor};
use serde::{Deserialize, Serialize};
use shakmaty::{CastlingMode, Chess, Position};
use thiserror::Error;

/// Errors raised while loading games from a PGN source.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Reading the source failed.
    #[error("Failed to read PGN: {0}")]
    Io(#[from] std::io::Error),
    /// A SAN token could not be resolved in the current position.
    #[error("Game {game}: cannot play move {san} at ply {ply}")]
    IllegalMove {
        game: usize,
        ply: usize,
        san: String,
    },
    /// The game starts from a custom position.
    #[error("Game {game}: custom start positions (FEN header) are not supported")]
    CustomStartPosition { game: usize },
}

/// Side to move / side played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Colour that moves at the given 0-based ply from the start position.
    pub fn at_ply(ply: usize) -> Self {
        if ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

/// A parsed game: ordered headers plus the main-line moves in UCI notation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Game {
    /// Header pairs in file order.
    pub headers: Vec<(String, String)>,
    /// Main-line moves, in play order.
    pub moves: Vec<String>,
}

impl Game {
    pub fn new(headers: Vec<(String, String)>, moves: Vec<String>) -> Self {
        Self { headers, moves }
    }

    /// First value recorded for `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn white(&self) -> Option<&str> {
        self.header("White")
    }

    pub fn black(&self) -> Option<&str> {
        self.header("Black")
    }

    /// Game termination marker from the `Result` header.
    pub fn result(&self) -> Option<&str> {
        self.header("Result")
    }

    /// Total plies, from `PlyCount` when it parses, otherwise the move count.
    pub fn ply_count(&self) -> usize {
        self.header("PlyCount")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.moves.len())
    }
}

/// Visitor state shared across one `read_game` call.
struct GameBuilder {
    game_index: usize,
}

/// Movetext accumulator for the game currently being read.
struct MainLine {
    headers: Vec<(String, String)>,
    position: Chess,
    moves: Vec<String>,
    outcome: Option<String>,
}

impl Visitor for GameBuilder {
    type Tags = Vec<(String, String)>;
    type Movetext = MainLine;
    type Output = Result<Game, LoadError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.game_index += 1;
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let key = String::from_utf8_lossy(key).into_owned();
        let value = value.decode_utf8_lossy().into_owned();
        tags.push((key, value));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        if tags.iter().any(|(k, _)| k == "FEN") {
            return ControlFlow::Break(Err(LoadError::CustomStartPosition {
                game: self.game_index,
            }));
        }
        ControlFlow::Continue(MainLine {
            headers: tags,
            position: Chess::default(),
            moves: Vec::new(),
            outcome: None,
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        match san.san.to_move(&movetext.position) {
            Ok(m) => {
                movetext
                    .moves
                    .push(m.to_uci(CastlingMode::Standard).to_string());
                movetext.position.play_unchecked(m);
                ControlFlow::Continue(())
            }
            Err(_) => ControlFlow::Break(Err(LoadError::IllegalMove {
                game: self.game_index,
                ply: movetext.moves.len() + 1,
                san: san.to_string(),
            })),
        }
    }

    fn outcome(
        &mut self,
        movetext: &mut Self::Movetext,
        outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        movetext.outcome = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        let MainLine {
            mut headers,
            moves,
            outcome,
            ..
        } = movetext;
        if !headers.iter().any(|(k, _)| k == "Result") {
            headers.push((
                "Result".to_string(),
                outcome.unwrap_or_else(|| "*".to_string()),
            ));
        }
        Ok(Game { headers, moves })
    }
}

/// Read every game from a PGN source, in order.
///
/// # Errors
///
/// Fails on the first I/O error, unresolvable move or custom start position.
pub fn load_games<R: Read>(source: R) -> Result<Vec<Game>, LoadError> {
    let mut reader = Reader::new(source);
    let mut builder = GameBuilder { game_index: 0 };
    let mut games = Vec::new();

    while let Some(game) = reader.read_game(&mut builder)? {
        games.push(game?);
    }

    tracing::debug!(games = games.len(), "loaded PGN");
    Ok(games)
}

/// Read every game from a PGN file.
pub fn load_games_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Game>, LoadError> {
    let file = File::open(path.as_ref())?;
    load_games(BufReader::new(file))
}

/// Distinct White/Black names in order of first appearance.
pub fn list_players(games: &[Game]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut players = Vec::new();

    for game in games {
        for name in [game.white(), game.black()].into_iter().flatten() {
            if seen.insert(name) {
                players.push(name.to_string());
            }
        }
    }

    players
}
