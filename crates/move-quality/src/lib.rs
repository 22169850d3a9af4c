//! Player move-quality analysis.
//!
//! This crate measures how closely a player's moves track an engine's top
//! choices. Games are loaded from PGN, the player's games are handed one by
//! one to an external analyser, and the evaluations it reports are grouped by
//! how decided each position already was.
//!
//! # Overview
//!
//! - [`load_games`] - PGN to [`Game`] records with UCI moves
//! - [`select_player_games`] - the games a player took part in, with colours
//! - [`to_uci_text`] - the analyser's input format
//! - [`AnalysisInvoker`] / [`ProcessInvoker`] - running the analyser
//! - [`parse_result_document`] - the analyser's XML output
//! - [`QualityClassifier`] - centipawn loss and position types
//! - [`aggregate`] - the final [`Report`]
//! - [`GameAnalyzer`] - all of the above for one player
//!
//! # Example
//!
//! ```ignore
//! use move_quality::{load_games_from_path, AnalysisConfig, GameAnalyzer, ProcessInvoker};
//!
//! let config = AnalysisConfig::default();
//! let games = load_games_from_path("games.pgn")?;
//! let analyzer = GameAnalyzer::new(ProcessInvoker::new(&config.analyser_path), config.clone())?;
//! let report = analyzer.analyze_player(&games, "Carlsen, Magnus")?;
//! ```

pub mod analyzer;
pub mod config;
pub mod evaluation;
pub mod game;
pub mod invoker;
pub mod parser;
pub mod quality;
pub mod report;
pub mod selector;
pub mod uci_text;

pub use analyzer::{player_move_count, AnalyzerError, GameAnalyzer};
pub use config::{AnalysisConfig, ConfigError, FailurePolicy};
pub use evaluation::{EvalValue, MATE_SENTINEL};
pub use game::{list_players, load_games, load_games_from_path, Color, Game, LoadError};
pub use invoker::{
    AnalysisInvoker, GameWorkspace, InvocationConfig, InvocationError, ProcessInvoker,
    ResultDocument,
};
pub use parser::{
    pad_records, parse_result_document, EvaluationOption, MoveEvaluationRecord, ParseError,
};
pub use quality::{ClassifiedRecord, DataError, PositionType, QualityClassifier, Thresholds};
pub use report::{aggregate, Report, ReportRow};
pub use selector::{player_color, select_player_games, SelectedGame};
pub use uci_text::{parse_uci_text, to_uci_text, ConversionError, UciGame};
