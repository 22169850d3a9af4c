//! Parsing of engine `info` lines.

use move_quality::EvalValue;

/// One principal-variation report from a multi-PV search.
#[derive(Debug, Clone, PartialEq)]
pub struct PvInfo {
    pub depth: u32,
    /// 1-based variation index; engines omit it when `MultiPV` is 1.
    pub multipv: usize,
    pub score: EvalValue,
    /// First move of the variation.
    pub first_move: String,
}

/// Parse an `info` line carrying a score and a principal variation.
///
/// Returns `None` for lines without depth, score or pv, and for
/// `lowerbound`/`upperbound` scores, which are not final.
///
/// Format: `info depth 15 seldepth 20 multipv 2 score cp 31 nodes 1000 pv e2e4 e7e5`
pub fn parse_pv_info(line: &str) -> Option<PvInfo> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") {
        return None;
    }

    let mut depth: Option<u32> = None;
    let mut multipv: usize = 1;
    let mut cp: Option<i32> = None;
    let mut mate: Option<i32> = None;
    let mut first_move: Option<String> = None;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                depth = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "multipv" => {
                multipv = parts
                    .get(i + 1)
                    .and_then(|v| v.parse().ok())
                    .filter(|&n| n > 0)?;
                i += 1;
            }
            "score" => {
                match parts.get(i + 1) {
                    Some(&"cp") => cp = parts.get(i + 2).and_then(|v| v.parse().ok()),
                    Some(&"mate") => mate = parts.get(i + 2).and_then(|v| v.parse().ok()),
                    _ => return None,
                }
                i += 2;
            }
            "lowerbound" | "upperbound" => return None,
            "pv" => {
                first_move = parts.get(i + 1).map(|m| m.to_string());
                break;
            }
            // Free text runs to the end of the line.
            "string" => return None,
            _ => {}
        }
        i += 1;
    }

    Some(PvInfo {
        depth: depth?,
        multipv,
        score: EvalValue::from_uci_score(cp, mate)?,
        first_move: first_move?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multipv_line() {
        let info = parse_pv_info(
            "info depth 15 seldepth 21 multipv 2 score cp -31 nodes 81234 nps 900000 pv d7d5 e4d5 d8d5",
        )
        .unwrap();
        assert_eq!(info.depth, 15);
        assert_eq!(info.multipv, 2);
        assert_eq!(info.score, EvalValue::Numeric(-31.0));
        assert_eq!(info.first_move, "d7d5");
    }

    #[test]
    fn test_multipv_defaults_to_one() {
        let info = parse_pv_info("info depth 3 score mate -2 pv h7h6").unwrap();
        assert_eq!(info.multipv, 1);
        assert_eq!(info.score, EvalValue::MateIn(-2));
    }

    #[test]
    fn test_bounds_are_ignored() {
        assert!(parse_pv_info("info depth 12 multipv 1 score cp 40 lowerbound pv e2e4").is_none());
        assert!(parse_pv_info("info depth 12 multipv 1 score cp 40 upperbound pv e2e4").is_none());
    }

    #[test]
    fn test_lines_without_pv_or_score() {
        assert!(parse_pv_info("info depth 12 currmove e2e4 currmovenumber 1").is_none());
        assert!(parse_pv_info("info depth 12 score cp 10").is_none());
        assert!(parse_pv_info("info string NNUE evaluation enabled").is_none());
        assert!(parse_pv_info("bestmove e2e4").is_none());
        assert!(parse_pv_info("").is_none());
    }

    #[test]
    fn test_zero_multipv_is_rejected() {
        assert!(parse_pv_info("info depth 1 multipv 0 score cp 1 pv e2e4").is_none());
    }

    #[test]
    fn test_mate_zero_is_rejected() {
        assert!(parse_pv_info("info depth 1 score mate 0 pv e1g1").is_none());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn centipawn_lines_parse(
                depth in 1u32..64,
                multipv in 1usize..10,
                cp in -5000i32..5000,
                nodes in any::<u32>(),
            ) {
                let line = format!(
                    "info depth {depth} seldepth {} multipv {multipv} score cp {cp} nodes {nodes} pv g1f3 d7d5",
                    depth + 4
                );
                let info = parse_pv_info(&line).unwrap();
                prop_assert_eq!(info.depth, depth);
                prop_assert_eq!(info.multipv, multipv);
                prop_assert_eq!(info.score, EvalValue::Numeric(f64::from(cp)));
                prop_assert_eq!(info.first_move, "g1f3");
            }

            #[test]
            fn arbitrary_lines_do_not_panic(line in "info( [a-z0-9-]{1,8}){0,12}") {
                let _ = parse_pv_info(&line);
            }
        }
    }
}
