//! Result document parsing.
//!
//! Expected shape (one `<move>` per analysed ply):
//!
//! ```xml
//! <gamelist>
//!   <game>
//!     <analysis>
//!       <move>
//!         <played>e2e4</played>
//!         <evaluation move="d2d4" value="31"/>
//!         <evaluation move="e2e4" value="28"/>
//!       </move>
//!     </analysis>
//!   </game>
//! </gamelist>
//! ```
//!
//! Evaluation elements appear in engine rank order, best first.

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::evaluation::EvalValue;

/// Errors raised while reading a result document.
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Malformed result document: {0}")]
    Xml(String),
    /// A required element is missing.
    #[error("Missing <{element}> element{}", location(*.ply))]
    MissingElement {
        element: &'static str,
        ply: Option<usize>,
    },
    /// An `<evaluation>` lacks a required attribute.
    #[error("Missing {attribute:?} attribute on evaluation at move {ply}")]
    MissingAttribute { attribute: &'static str, ply: usize },
    /// An evaluation value is neither numeric nor a mate marker.
    #[error("Unrecognized evaluation value {value:?} for {move_id} at move {ply}")]
    UnrecognizedValue {
        ply: usize,
        move_id: String,
        value: String,
    },
    /// The same candidate move is evaluated twice in one position.
    #[error("Duplicate evaluation for {move_id} at move {ply}")]
    DuplicateEvaluation { ply: usize, move_id: String },
    /// No evaluation element matches the played move.
    #[error("No evaluation for played move {played} at move {ply}")]
    NoEvaluationForPlayed { ply: usize, played: String },
}

fn location(ply: Option<usize>) -> String {
    ply.map(|p| format!(" at move {}", p)).unwrap_or_default()
}

/// One engine candidate for a position.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOption {
    pub move_id: String,
    /// Centipawns, mates collapsed to the sentinel.
    pub score: f64,
    /// 1 = best.
    pub rank: usize,
}

/// Evaluations of one analysed move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveEvaluationRecord {
    pub played_move: String,
    pub played_eval: f64,
    /// Candidate scores best to worst; `None` marks padding.
    pub alternatives: Vec<Option<f64>>,
}

impl MoveEvaluationRecord {
    /// Build from ranked options, resolving the played move's score.
    ///
    /// `ply` is only used for error reporting.
    pub fn from_options(
        ply: usize,
        played_move: String,
        options: &[EvaluationOption],
    ) -> Result<Self, ParseError> {
        let played_eval = options
            .iter()
            .find(|o| o.move_id == played_move)
            .map(|o| o.score)
            .ok_or_else(|| ParseError::NoEvaluationForPlayed {
                ply,
                played: played_move.clone(),
            })?;

        Ok(Self {
            played_move,
            played_eval,
            alternatives: options.iter().map(|o| Some(o.score)).collect(),
        })
    }

    /// Score of the given 1-based rank, if present.
    pub fn best(&self, rank: usize) -> Option<f64> {
        rank.checked_sub(1)
            .and_then(|i| self.alternatives.get(i))
            .copied()
            .flatten()
    }
}

/// Parse every `<move>` of the first game in a result document.
///
/// # Errors
///
/// Fails on malformed XML, missing elements, unrecognized values, duplicate
/// candidates and played moves without a matching evaluation.
pub fn parse_result_document(xml: &str) -> Result<Vec<MoveEvaluationRecord>, ParseError> {
    let document = Document::parse(xml).map_err(|e| ParseError::Xml(e.to_string()))?;

    let gamelist = document.root_element();
    if !gamelist.has_tag_name("gamelist") {
        return Err(ParseError::MissingElement {
            element: "gamelist",
            ply: None,
        });
    }
    let game = child(gamelist, "game").ok_or(ParseError::MissingElement {
        element: "game",
        ply: None,
    })?;
    let analysis = child(game, "analysis").ok_or(ParseError::MissingElement {
        element: "analysis",
        ply: None,
    })?;

    analysis
        .children()
        .filter(|n| n.has_tag_name("move"))
        .enumerate()
        .map(|(i, node)| parse_move(i + 1, node))
        .collect()
}

fn parse_move(ply: usize, node: Node<'_, '_>) -> Result<MoveEvaluationRecord, ParseError> {
    let played = child(node, "played")
        .and_then(|p| p.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ParseError::MissingElement {
            element: "played",
            ply: Some(ply),
        })?;

    let mut options: Vec<EvaluationOption> = Vec::new();
    for evaluation in node.children().filter(|n| n.has_tag_name("evaluation")) {
        let move_id = evaluation
            .attribute("move")
            .ok_or(ParseError::MissingAttribute {
                attribute: "move",
                ply,
            })?;
        let raw = evaluation
            .attribute("value")
            .ok_or(ParseError::MissingAttribute {
                attribute: "value",
                ply,
            })?;

        let score = match EvalValue::parse(raw) {
            EvalValue::Numeric(value) => value,
            mate @ EvalValue::MateIn(_) => mate.to_centipawns().unwrap_or_default(),
            EvalValue::Unparseable(value) => {
                return Err(ParseError::UnrecognizedValue {
                    ply,
                    move_id: move_id.to_string(),
                    value,
                });
            }
        };

        if options.iter().any(|o| o.move_id == move_id) {
            return Err(ParseError::DuplicateEvaluation {
                ply,
                move_id: move_id.to_string(),
            });
        }
        options.push(EvaluationOption {
            move_id: move_id.to_string(),
            score,
            rank: options.len() + 1,
        });
    }

    MoveEvaluationRecord::from_options(ply, played, &options)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Pad every record to the widest alternative list of the run.
///
/// Returns that width.
pub fn pad_records(records: &mut [MoveEvaluationRecord]) -> usize {
    let width = records
        .iter()
        .map(|r| r.alternatives.len())
        .max()
        .unwrap_or(0);
    for record in records.iter_mut() {
        record.alternatives.resize(width, None);
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(moves: &str) -> String {
        format!(
            "<gamelist><game><analysis>{}</analysis></game></gamelist>",
            moves
        )
    }

    #[test]
    fn test_parses_ranked_alternatives() {
        let xml = document(
            r#"<move><played>e2e4</played>
                 <evaluation move="d2d4" value="31"/>
                 <evaluation move="e2e4" value="28"/>
                 <evaluation move="g1f3" value="20"/>
               </move>"#,
        );
        let records = parse_result_document(&xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].played_move, "e2e4");
        assert_eq!(records[0].played_eval, 28.0);
        assert_eq!(
            records[0].alternatives,
            vec![Some(31.0), Some(28.0), Some(20.0)]
        );
        assert_eq!(records[0].best(1), Some(31.0));
        assert_eq!(records[0].best(4), None);
        assert_eq!(records[0].best(0), None);
    }

    #[test]
    fn test_mate_values_use_sentinel() {
        let xml = document(
            r#"<move><played>h5f7</played>
                 <evaluation move="h5f7" value="mate 1"/>
                 <evaluation move="c4f7" value="mate -3"/>
               </move>"#,
        );
        let records = parse_result_document(&xml).unwrap();
        assert_eq!(records[0].played_eval, 1000.0);
        assert_eq!(records[0].alternatives, vec![Some(1000.0), Some(-1000.0)]);
    }

    #[test]
    fn test_unmatched_played_move_names_id() {
        let xml = document(
            r#"<move><played>a2a3</played><evaluation move="a2a3" value="0"/></move>
               <move><played>g8f6</played>
                 <evaluation move="b8c6" value="10"/>
                 <evaluation move="e7e5" value="5"/>
               </move>"#,
        );
        let err = parse_result_document(&xml).unwrap_err();
        assert_eq!(
            err,
            ParseError::NoEvaluationForPlayed {
                ply: 2,
                played: "g8f6".to_string()
            }
        );
        assert!(err.to_string().contains("g8f6"));
    }

    #[test]
    fn test_unrecognized_value_is_fatal() {
        let xml = document(
            r#"<move><played>e2e4</played><evaluation move="e2e4" value="book"/></move>"#,
        );
        assert_eq!(
            parse_result_document(&xml).unwrap_err(),
            ParseError::UnrecognizedValue {
                ply: 1,
                move_id: "e2e4".to_string(),
                value: "book".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_candidates_are_rejected() {
        let xml = document(
            r#"<move><played>e2e4</played>
                 <evaluation move="e2e4" value="20"/>
                 <evaluation move="e2e4" value="18"/>
               </move>"#,
        );
        assert!(matches!(
            parse_result_document(&xml),
            Err(ParseError::DuplicateEvaluation { ply: 1, .. })
        ));
    }

    #[test]
    fn test_missing_structure() {
        assert!(matches!(
            parse_result_document("<games/>"),
            Err(ParseError::MissingElement { element: "gamelist", .. })
        ));
        assert!(matches!(
            parse_result_document("<gamelist><game/></gamelist>"),
            Err(ParseError::MissingElement { element: "analysis", .. })
        ));
        assert!(matches!(
            parse_result_document(&document("<move><evaluation move=\"e2e4\" value=\"1\"/></move>")),
            Err(ParseError::MissingElement { element: "played", ply: Some(1) })
        ));
        assert!(matches!(
            parse_result_document("<gamelist><game>"),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_missing_attribute() {
        let xml = document(r#"<move><played>e2e4</played><evaluation move="e2e4"/></move>"#);
        assert_eq!(
            parse_result_document(&xml).unwrap_err(),
            ParseError::MissingAttribute {
                attribute: "value",
                ply: 1
            }
        );
    }

    #[test]
    fn test_empty_analysis_yields_no_records() {
        assert!(parse_result_document(&document("")).unwrap().is_empty());
    }

    #[test]
    fn test_extra_elements_are_ignored() {
        let xml = r#"<?xml version="1.0"?>
<gamelist>
  <game>
    <tags><tag name="White" value="Alice"/></tags>
    <moves>e2e4 e7e5</moves>
    <analysis engine="Stockfish" searchdepth="15" variations="3">
      <move><played>e2e4</played><evaluation move="e2e4" value="25"/></move>
    </analysis>
  </game>
</gamelist>"#;
        assert_eq!(parse_result_document(xml).unwrap().len(), 1);
    }

    #[test]
    fn test_pad_records_to_run_width() {
        let mut records = vec![
            MoveEvaluationRecord {
                played_move: "a".to_string(),
                played_eval: 1.0,
                alternatives: vec![Some(1.0)],
            },
            MoveEvaluationRecord {
                played_move: "b".to_string(),
                played_eval: 2.0,
                alternatives: vec![Some(5.0), Some(3.0), Some(2.0)],
            },
        ];
        assert_eq!(pad_records(&mut records), 3);
        assert_eq!(records[0].alternatives, vec![Some(1.0), None, None]);
        assert_eq!(records[1].alternatives.len(), 3);
        assert_eq!(pad_records(&mut []), 0);
    }
}
