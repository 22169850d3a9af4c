//! Per-ply analysis of one game.

use move_quality::Color;

use crate::engine::{Candidate, EngineError, Search};

/// Which plies to analyse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlyFilter {
    /// Leading plies to skip.
    pub book_depth: usize,
    /// Only analyse this colour's moves; `None` analyses both.
    pub color: Option<Color>,
}

impl PlyFilter {
    /// Whether the move at 0-based `ply` is analysed.
    pub fn includes(&self, ply: usize) -> bool {
        ply >= self.book_depth && self.color.map_or(true, |c| c == Color::at_ply(ply))
    }
}

/// The evaluations gathered for one played move.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysedMove {
    /// 1-based ply number.
    pub ply: usize,
    pub played: String,
    /// Best first; a restricted search for the played move comes last.
    pub evaluations: Vec<Candidate>,
}

/// Analyse every move of `moves` that passes `filter`.
///
/// When the played move is not among the engine's top variations, a search
/// restricted to it is run and its result appended.
///
/// # Errors
///
/// Propagates engine failures, and fails when the restricted search does not
/// report the played move.
pub fn analyse_moves<S: Search>(
    engine: &mut S,
    moves: &[String],
    filter: PlyFilter,
) -> Result<Vec<AnalysedMove>, EngineError> {
    let mut analysed = Vec::new();

    for (ply, played) in moves.iter().enumerate() {
        if !filter.includes(ply) {
            continue;
        }
        let before = &moves[..ply];

        let mut evaluations = engine.search(before, None)?;
        if !evaluations.iter().any(|c| &c.move_id == played) {
            let restricted = engine.search(before, Some(played))?;
            let own = restricted
                .into_iter()
                .find(|c| &c.move_id == played)
                .ok_or_else(|| {
                    EngineError::InvalidResponse(format!(
                        "restricted search at ply {} did not report {}",
                        ply + 1,
                        played
                    ))
                })?;
            evaluations.push(own);
        }

        tracing::debug!(ply = ply + 1, played = %played, candidates = evaluations.len(), "analysed move");
        analysed.push(AnalysedMove {
            ply: ply + 1,
            played: played.clone(),
            evaluations,
        });
    }

    Ok(analysed)
}
