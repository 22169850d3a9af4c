//! Aggregation of classified moves into the final report.

use serde::Serialize;

use crate::quality::{ClassifiedRecord, PositionType};

/// Aggregates for one position type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub position_type: PositionType,
    /// Number of moves played in positions of this type.
    pub positions: usize,
    /// `best_matches[i]` counts moves that matched rank `i + 1`.
    pub best_matches: Vec<usize>,
    /// Mean loss over moves with a defined loss.
    pub avg_centipawn_loss: Option<f64>,
}

/// The result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Number of `# i best` columns.
    pub rank_count: usize,
    /// At most one row per position type, in [`PositionType::ALL`] order.
    pub rows: Vec<ReportRow>,
    /// Moves that survived the book depth and were classified.
    pub analysed_moves: usize,
    /// Moves the player made across the selected games.
    pub player_moves: usize,
}

impl Report {
    /// Column headers in display order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec!["Position Type".to_string(), "# Positions".to_string()];
        columns.extend((1..=self.rank_count).map(|i| format!("# {} best", i)));
        columns.push("Avg. Centipawn Loss".to_string());
        columns
    }

    pub fn total_positions(&self) -> usize {
        self.rows.iter().map(|r| r.positions).sum()
    }
}

/// Group classified records by position type.
///
/// Only observed position types produce a row.
pub fn aggregate(records: &[ClassifiedRecord], rank_count: usize, player_moves: usize) -> Report {
    let rows = PositionType::ALL
        .iter()
        .filter_map(|&position_type| {
            let group: Vec<&ClassifiedRecord> = records
                .iter()
                .filter(|r| r.position_type == position_type)
                .collect();
            if group.is_empty() {
                return None;
            }

            let best_matches = (1..=rank_count)
                .map(|rank| group.iter().filter(|r| r.matches_rank(rank)).count())
                .collect();

            let losses: Vec<f64> = group.iter().filter_map(|r| r.centipawn_loss).collect();
            let avg_centipawn_loss = if losses.is_empty() {
                None
            } else {
                Some(losses.iter().sum::<f64>() / losses.len() as f64)
            };

            Some(ReportRow {
                position_type,
                positions: group.len(),
                best_matches,
                avg_centipawn_loss,
            })
        })
        .collect();

    Report {
        rank_count,
        rows,
        analysed_moves: records.len(),
        player_moves,
    }
}
