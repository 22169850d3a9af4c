//! The analysis pipeline.
//!
//! Per selected game: convert to analyser text, write it into a scratch
//! workspace, invoke the analyser, parse its result document. The records of
//! all games are then padded to a common width, classified and aggregated.

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{AnalysisConfig, ConfigError, FailurePolicy};
use crate::game::{Color, Game};
use crate::invoker::{AnalysisInvoker, GameWorkspace, InvocationConfig, InvocationError};
use crate::parser::{pad_records, parse_result_document, MoveEvaluationRecord, ParseError};
use crate::quality::{DataError, QualityClassifier};
use crate::report::{aggregate, Report};
use crate::selector::{select_player_games, SelectedGame};
use crate::uci_text::{to_uci_text, ConversionError};

/// Errors that end an analysis run.
///
/// `game` is the 1-based index of the game in the loaded file.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Game {game}: {source}")]
    Conversion {
        game: usize,
        #[source]
        source: ConversionError,
    },
    #[error("Game {game}: {source}")]
    Invocation {
        game: usize,
        #[source]
        source: InvocationError,
    },
    #[error("Game {game}: {source}")]
    Parse {
        game: usize,
        #[source]
        source: ParseError,
    },
    #[error("Game {game}: failed to prepare analysis workspace: {source}")]
    Workspace {
        game: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    /// The whole run exceeded its deadline.
    #[error("Analysis run exceeded {0:?}")]
    RunTimedOut(Duration),
}

type GameOutcome = Result<Vec<MoveEvaluationRecord>, AnalyzerError>;

/// Number of moves `color` makes in a game of `plies` half-moves.
pub fn player_move_count(plies: usize, color: Color) -> usize {
    match color {
        Color::White => plies.div_ceil(2),
        Color::Black => plies / 2,
    }
}

/// Runs the per-game pipeline and builds the report.
pub struct GameAnalyzer<I> {
    invoker: I,
    config: AnalysisConfig,
}

impl<I: AnalysisInvoker> GameAnalyzer<I> {
    /// Create an analyzer, validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] when the configuration is invalid.
    pub fn new(invoker: I, config: AnalysisConfig) -> Result<Self, AnalyzerError> {
        config.validate()?;
        Ok(Self { invoker, config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Analyse every game `player` took part in and aggregate the result.
    ///
    /// # Errors
    ///
    /// Fails when the player is absent, when a game fails under
    /// [`FailurePolicy::Abort`], when the run deadline passes, or when no
    /// move is left to classify.
    pub fn analyze_player(&self, games: &[Game], player: &str) -> Result<Report, AnalyzerError> {
        let selected = select_player_games(games, player)?;
        let deadline = self.config.run_timeout().map(|t| Instant::now() + t);

        let analysed = self.run_games(&selected, deadline)?;
        // Skipped games count toward neither side of the summary.
        let player_moves: usize = analysed
            .iter()
            .map(|(i, _)| player_move_count(selected[*i].game.ply_count(), selected[*i].color))
            .sum();
        let mut records: Vec<MoveEvaluationRecord> = analysed
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect();
        let width = pad_records(&mut records);

        let classified =
            QualityClassifier::new(self.config.thresholds()).classify_all(records, width)?;

        tracing::info!(
            analysed = classified.len(),
            player_moves,
            "after dropping opening moves: {} / {}",
            classified.len(),
            player_moves
        );

        Ok(aggregate(&classified, width.saturating_sub(1), player_moves))
    }

    /// Convert, invoke and parse a single game.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error tagged with the game number.
    pub fn analyze_game(
        &self,
        selected: &SelectedGame<'_>,
        deadline: Option<Instant>,
    ) -> GameOutcome {
        let game = selected.index + 1;
        let timeout = self.invocation_timeout(deadline)?;

        let text = to_uci_text(selected.game)
            .map_err(|source| AnalyzerError::Conversion { game, source })?;
        let workspace = GameWorkspace::create(game, self.config.keep_artifacts)
            .map_err(|source| AnalyzerError::Workspace { game, source })?;
        let input_path = workspace.input_path();
        fs::write(&input_path, text).map_err(|source| AnalyzerError::Workspace { game, source })?;
        tracing::debug!(game, path = %input_path.display(), "wrote analyser input");

        let invocation = InvocationConfig {
            engine_path: self.config.engine_path.clone(),
            search_depth: self.config.search_depth,
            book_depth: self.config.book_depth,
            variations: self.config.variations,
            color: Some(selected.color),
            input_path,
            timeout,
        };
        let document = self
            .invoker
            .invoke(&invocation)
            .map_err(|source| match source {
                InvocationError::TimedOut(_) if deadline.is_some_and(|d| Instant::now() >= d) => {
                    self.run_timed_out()
                }
                source => AnalyzerError::Invocation { game, source },
            })?;

        let records = parse_result_document(document.as_str())
            .map_err(|source| AnalyzerError::Parse { game, source })?;
        tracing::info!(
            game,
            color = selected.color.as_str(),
            moves = records.len(),
            "analysed game"
        );
        Ok(records)
    }

    /// Per-invocation timeout, bounded by the time left in the run.
    fn invocation_timeout(&self, deadline: Option<Instant>) -> Result<Option<Duration>, AnalyzerError> {
        let per_game = self.config.invocation_timeout();
        let Some(deadline) = deadline else {
            return Ok(per_game);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(self.run_timed_out());
        }
        Ok(Some(per_game.map_or(remaining, |t| t.min(remaining))))
    }

    fn run_timed_out(&self) -> AnalyzerError {
        AnalyzerError::RunTimedOut(self.config.run_timeout().unwrap_or_default())
    }

    /// Whether `err` ends the run under the configured failure policy.
    fn is_fatal(&self, err: &AnalyzerError) -> bool {
        match err {
            AnalyzerError::RunTimedOut(_) => true,
            _ => self.config.failure_policy == FailurePolicy::Abort,
        }
    }

    /// Analyse the selected games on up to `jobs` threads.
    ///
    /// Returns `(selection index, records)` for each analysed game in
    /// selection order; skipped games are dropped.
    fn run_games(
        &self,
        selected: &[SelectedGame<'_>],
        deadline: Option<Instant>,
    ) -> Result<Vec<(usize, Vec<MoveEvaluationRecord>)>, AnalyzerError> {
        let jobs = self.config.jobs.clamp(1, selected.len().max(1));
        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel();

        if jobs == 1 {
            self.worker(selected, &next, &stop, deadline, tx);
        } else {
            tracing::info!(jobs, games = selected.len(), "analysing in parallel");
            thread::scope(|s| {
                for _ in 0..jobs {
                    let tx = tx.clone();
                    let (next, stop) = (&next, &stop);
                    s.spawn(move || self.worker(selected, next, stop, deadline, tx));
                }
                drop(tx);
            });
        }

        let mut slots: Vec<Option<GameOutcome>> = (0..selected.len()).map(|_| None).collect();
        for (i, outcome) in rx {
            slots[i] = Some(outcome);
        }

        let mut results = Vec::with_capacity(selected.len());
        for (i, (slot, game)) in slots.into_iter().zip(selected).enumerate() {
            match slot {
                // Never started because an earlier failure stopped the run.
                None => {}
                Some(Ok(records)) => results.push((i, records)),
                Some(Err(err)) if self.is_fatal(&err) => return Err(err),
                Some(Err(err)) => {
                    tracing::warn!(game = game.index + 1, error = %err, "skipping game");
                }
            }
        }
        Ok(results)
    }

    fn worker(
        &self,
        selected: &[SelectedGame<'_>],
        next: &AtomicUsize,
        stop: &AtomicBool,
        deadline: Option<Instant>,
        tx: Sender<(usize, GameOutcome)>,
    ) {
        while !stop.load(Ordering::Relaxed) {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let Some(game) = selected.get(i) else {
                break;
            };
            let outcome = self.analyze_game(game, deadline);
            if outcome.as_ref().is_err_and(|e| self.is_fatal(e)) {
                stop.store(true, Ordering::Relaxed);
            }
            if tx.send((i, outcome)).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ResultDocument;

    /// Answers every invocation with the same document.
    struct FixedInvoker(String);

    impl AnalysisInvoker for FixedInvoker {
        fn invoke(&self, config: &InvocationConfig) -> Result<ResultDocument, InvocationError> {
            assert!(config.input_path.exists());
            Ok(ResultDocument::new(self.0.clone()))
        }
    }

    fn game(white: &str, black: &str) -> Game {
        Game::new(
            vec![
                ("White".to_string(), white.to_string()),
                ("Black".to_string(), black.to_string()),
                ("Result".to_string(), "1-0".to_string()),
            ],
            vec!["e2e4".to_string(), "e7e5".to_string(), "g1f3".to_string()],
        )
    }

    const ONE_MOVE: &str = r#"<gamelist><game><analysis>
        <move><played>g1f3</played>
          <evaluation move="g1f3" value="40"/>
          <evaluation move="d2d4" value="35"/>
        </move>
      </analysis></game></gamelist>"#;

    #[test]
    fn test_player_move_count() {
        assert_eq!(player_move_count(0, Color::White), 0);
        assert_eq!(player_move_count(3, Color::White), 2);
        assert_eq!(player_move_count(3, Color::Black), 1);
        assert_eq!(player_move_count(4, Color::Black), 2);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AnalysisConfig {
            lost_threshold: 100,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            GameAnalyzer::new(FixedInvoker(String::new()), config),
            Err(AnalyzerError::Config(ConfigError::InvalidThresholds { .. }))
        ));
    }

    #[test]
    fn test_single_game_report() {
        let analyzer =
            GameAnalyzer::new(FixedInvoker(ONE_MOVE.to_string()), AnalysisConfig::default())
                .unwrap();
        let report = analyzer.analyze_player(&[game("me", "you")], "me").unwrap();

        assert_eq!(report.rank_count, 1);
        assert_eq!(report.analysed_moves, 1);
        assert_eq!(report.player_moves, 2);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].best_matches, vec![1]);
        assert_eq!(report.rows[0].avg_centipawn_loss, Some(0.0));
    }

    #[test]
    fn test_expired_deadline_stops_run() {
        let analyzer =
            GameAnalyzer::new(FixedInvoker(ONE_MOVE.to_string()), AnalysisConfig::default())
                .unwrap();
        let games = [game("me", "you")];
        let selected = select_player_games(&games, "me").unwrap();
        let past = Instant::now() - Duration::from_millis(1);
        assert!(matches!(
            analyzer.analyze_game(&selected[0], Some(past)),
            Err(AnalyzerError::RunTimedOut(_))
        ));
    }

    #[test]
    fn test_invocation_timeout_bounded_by_deadline() {
        let config = AnalysisConfig {
            invocation_timeout_secs: Some(600),
            ..AnalysisConfig::default()
        };
        let analyzer = GameAnalyzer::new(FixedInvoker(String::new()), config).unwrap();

        assert_eq!(
            analyzer.invocation_timeout(None).unwrap(),
            Some(Duration::from_secs(600))
        );
        let bounded = analyzer
            .invocation_timeout(Some(Instant::now() + Duration::from_secs(5)))
            .unwrap()
            .unwrap();
        assert!(bounded <= Duration::from_secs(5));
    }
}
