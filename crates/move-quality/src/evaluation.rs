//! Evaluation values as reported by the analyser.

use std::fmt;

/// Centipawn magnitude used in place of a forced mate score.
///
/// This is an approximation flag, not a real evaluation: every `mate N`
/// collapses to `+MATE_SENTINEL` and every `mate -N` to `-MATE_SENTINEL`,
/// regardless of the distance to mate.
pub const MATE_SENTINEL: f64 = 1000.0;

/// A raw evaluation value from an `<evaluation value="...">` attribute.
///
/// Every value string maps to exactly one variant; callers decide what to
/// do with [`EvalValue::Unparseable`].
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    /// Plain centipawn score (positive = good for the side to move).
    Numeric(f64),
    /// Forced mate; positive distance = side to move mates, negative = gets mated.
    MateIn(i32),
    /// Anything that is neither a finite number nor a `mate` marker.
    Unparseable(String),
}

impl EvalValue {
    /// Classify a value string.
    ///
    /// Accepted forms are a finite decimal number, `mate <k>` and
    /// `mate -<k>` with `k` a positive integer.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return Self::Numeric(value);
            }
            return Self::Unparseable(raw.to_string());
        }

        if let Some(distance) = trimmed.strip_prefix("mate ") {
            let (negative, digits) = match distance.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, distance),
            };
            let all_digits = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
            if all_digits {
                // Distances beyond i32 saturate; only the sign reaches the sentinel.
                let k = digits
                    .parse::<u64>()
                    .map_or(i32::MAX, |k| i32::try_from(k).unwrap_or(i32::MAX));
                if digits.bytes().any(|b| b != b'0') {
                    return Self::MateIn(if negative { -k } else { k });
                }
            }
        }

        Self::Unparseable(raw.to_string())
    }

    /// Convert to centipawns, collapsing mates to [`MATE_SENTINEL`].
    ///
    /// Returns `None` for [`EvalValue::Unparseable`].
    pub fn to_centipawns(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::MateIn(distance) if *distance < 0 => Some(-MATE_SENTINEL),
            Self::MateIn(_) => Some(MATE_SENTINEL),
            Self::Unparseable(_) => None,
        }
    }

    /// Build from a UCI `score` pair, preferring mate over centipawns.
    ///
    /// `mate 0` (side to move is already mated) has no usable value.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (mate, cp) {
            (Some(0), _) => None,
            (Some(m), _) => Some(Self::MateIn(m)),
            (None, Some(c)) => Some(Self::Numeric(f64::from(c))),
            (None, None) => None,
        }
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{}", value),
            Self::MateIn(distance) => write!(f, "mate {}", distance),
            Self::Unparseable(raw) => f.write_str(raw),
        }
    }
}
