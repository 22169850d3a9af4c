//! Per-move quality metrics and position classification.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::parser::MoveEvaluationRecord;

/// Errors in the assembled evaluation data of a run.
#[derive(Error, Debug, PartialEq)]
pub enum DataError {
    /// Nothing was left to classify.
    #[error("No analysable moves (all games too short for the book depth?)")]
    NoAnalysableMoves,
    /// A record was not padded to the run width.
    #[error("Record {index} has {found} alternatives, expected {expected}")]
    InconsistentPadding {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Category of a position, from the best available evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionType {
    /// Neither side is clearly better.
    Undecided,
    /// The player is clearly better but not yet winning outright.
    Winning,
    /// The player is clearly worse but not yet lost outright.
    Losing,
    /// The game is already decided one way or the other.
    PostWinOrLose,
}

impl PositionType {
    /// Report row order.
    pub const ALL: [PositionType; 4] = [
        PositionType::Undecided,
        PositionType::Winning,
        PositionType::Losing,
        PositionType::PostWinOrLose,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PositionType::Undecided => "undecided",
            PositionType::Winning => "winning",
            PositionType::Losing => "losing",
            PositionType::PostWinOrLose => "post win or lose",
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for PositionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Centipawn bounds separating the position types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub undecided: f64,
    pub lost: f64,
}

impl Thresholds {
    /// Classify a best-move evaluation from the player's point of view.
    pub fn classify(&self, eval: f64) -> PositionType {
        if eval.abs() <= self.undecided {
            PositionType::Undecided
        } else if eval > self.undecided && eval < self.lost {
            PositionType::Winning
        } else if eval < -self.undecided && eval > -self.lost {
            PositionType::Losing
        } else {
            PositionType::PostWinOrLose
        }
    }
}

/// A move record with its derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub record: MoveEvaluationRecord,
    /// Best evaluation minus played evaluation.
    pub centipawn_loss: Option<f64>,
    pub position_type: PositionType,
    /// `best_i - best_{i+1}` for ranks `1..width`; absent when either side is padding.
    pub rank_gaps: Vec<Option<f64>>,
    /// Whether the played move scored exactly as rank `i` did, for ranks `1..width`.
    pub played_rank: Vec<bool>,
}

impl ClassifiedRecord {
    /// Whether the played move matched the given 1-based rank.
    pub fn matches_rank(&self, rank: usize) -> bool {
        rank.checked_sub(1)
            .and_then(|i| self.played_rank.get(i))
            .copied()
            .unwrap_or(false)
    }
}

/// Derives loss, rank gaps and position type for padded records.
#[derive(Debug, Clone, Copy)]
pub struct QualityClassifier {
    thresholds: Thresholds,
}

impl QualityClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Classify one record of a run of the given width.
    ///
    /// Returns `None` when the record has no rank-1 evaluation.
    pub fn classify(&self, record: MoveEvaluationRecord, width: usize) -> Option<ClassifiedRecord> {
        let best = record.best(1)?;
        let ranks = width.saturating_sub(1);

        let rank_gaps = (1..=ranks)
            .map(|i| match (record.best(i), record.best(i + 1)) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            })
            .collect();
        let played_rank = (1..=ranks)
            .map(|i| record.best(i) == Some(record.played_eval))
            .collect();

        Some(ClassifiedRecord {
            centipawn_loss: Some(best - record.played_eval),
            position_type: self.thresholds.classify(best),
            rank_gaps,
            played_rank,
            record,
        })
    }

    /// Classify every record of a run, checking that all share `width`.
    ///
    /// # Errors
    ///
    /// [`DataError::InconsistentPadding`] when a record is not `width` wide,
    /// [`DataError::NoAnalysableMoves`] when nothing remains.
    pub fn classify_all(
        &self,
        records: Vec<MoveEvaluationRecord>,
        width: usize,
    ) -> Result<Vec<ClassifiedRecord>, DataError> {
        if let Some((index, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.alternatives.len() != width)
        {
            return Err(DataError::InconsistentPadding {
                index,
                expected: width,
                found: record.alternatives.len(),
            });
        }

        let classified: Vec<ClassifiedRecord> = records
            .into_iter()
            .filter_map(|r| self.classify(r, width))
            .collect();

        if classified.is_empty() {
            return Err(DataError::NoAnalysableMoves);
        }
        Ok(classified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEFAULT: Thresholds = Thresholds {
        undecided: 200.0,
        lost: 500.0,
    };

    fn record(played: f64, alternatives: Vec<Option<f64>>) -> MoveEvaluationRecord {
        MoveEvaluationRecord {
            played_move: "e2e4".to_string(),
            played_eval: played,
            alternatives,
        }
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(DEFAULT.classify(200.0), PositionType::Undecided);
        assert_eq!(DEFAULT.classify(-200.0), PositionType::Undecided);
        assert_eq!(DEFAULT.classify(201.0), PositionType::Winning);
        assert_eq!(DEFAULT.classify(499.0), PositionType::Winning);
        assert_eq!(DEFAULT.classify(500.0), PositionType::PostWinOrLose);
        assert_eq!(DEFAULT.classify(-499.0), PositionType::Losing);
        assert_eq!(DEFAULT.classify(-500.0), PositionType::PostWinOrLose);
        assert_eq!(DEFAULT.classify(-1000.0), PositionType::PostWinOrLose);
    }

    #[test]
    fn test_classify_metrics() {
        let classifier = QualityClassifier::new(DEFAULT);
        let classified = classifier
            .classify(record(28.0, vec![Some(31.0), Some(28.0), Some(20.0)]), 3)
            .unwrap();

        assert_eq!(classified.centipawn_loss, Some(3.0));
        assert_eq!(classified.position_type, PositionType::Undecided);
        assert_eq!(classified.rank_gaps, vec![Some(3.0), Some(8.0)]);
        assert_eq!(classified.played_rank, vec![false, true]);
        assert!(classified.matches_rank(2));
        assert!(!classified.matches_rank(3));
    }

    #[test]
    fn test_padding_yields_absent_gaps() {
        let classifier = QualityClassifier::new(DEFAULT);
        let classified = classifier
            .classify(record(31.0, vec![Some(31.0), None, None]), 3)
            .unwrap();
        assert_eq!(classified.rank_gaps, vec![None, None]);
        assert_eq!(classified.played_rank, vec![true, false]);
        assert_eq!(classified.centipawn_loss, Some(0.0));
    }

    #[test]
    fn test_missing_best_is_excluded() {
        let classifier = QualityClassifier::new(DEFAULT);
        assert!(classifier.classify(record(0.0, vec![None, None]), 2).is_none());
    }

    #[test]
    fn test_single_width_has_no_rank_columns() {
        let classifier = QualityClassifier::new(DEFAULT);
        let classified = classifier.classify(record(10.0, vec![Some(10.0)]), 1).unwrap();
        assert!(classified.rank_gaps.is_empty());
        assert!(classified.played_rank.is_empty());
    }

    #[test]
    fn test_classify_all_checks_padding() {
        let classifier = QualityClassifier::new(DEFAULT);
        let records = vec![
            record(1.0, vec![Some(1.0), Some(0.0)]),
            record(1.0, vec![Some(1.0)]),
        ];
        assert_eq!(
            classifier.classify_all(records, 2),
            Err(DataError::InconsistentPadding {
                index: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_classify_all_empty_is_error() {
        let classifier = QualityClassifier::new(DEFAULT);
        assert_eq!(
            classifier.classify_all(vec![], 0),
            Err(DataError::NoAnalysableMoves)
        );
    }

    #[test]
    fn test_labels() {
        let labels: Vec<String> = PositionType::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, ["undecided", "winning", "losing", "post win or lose"]);
        assert_eq!(
            serde_json::to_string(&PositionType::PostWinOrLose).unwrap(),
            "\"post win or lose\""
        );
    }

    proptest! {
        #[test]
        fn prop_loss_present_iff_best_present(
            best in proptest::option::of(-1000.0f64..1000.0),
            played in -1000.0f64..1000.0,
        ) {
            let classifier = QualityClassifier::new(DEFAULT);
            let result = classifier.classify(record(played, vec![best, Some(played)]), 2);
            match best {
                Some(b) => {
                    let classified = result.unwrap();
                    prop_assert_eq!(classified.centipawn_loss, Some(b - played));
                }
                None => prop_assert!(result.is_none()),
            }
        }

        #[test]
        fn prop_classification_is_symmetric(
            eval in 0.0f64..1000.0,
        ) {
            let positive = DEFAULT.classify(eval);
            let negative = DEFAULT.classify(-eval);
            let mirrored = match positive {
                PositionType::Winning => PositionType::Losing,
                other => other,
            };
            prop_assert_eq!(negative, mirrored);
        }
    }
}
