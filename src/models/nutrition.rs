use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Letter grade derived from a nutrition score, A (best) to E (worst)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NutritionGrade {
    A,
    B,
    C,
    D,
    E,
}

impl NutritionGrade {
    /// Maps a nutrition score onto its grade band.
    ///
    /// Bands are closed on the upper bound: -1 is still A, 2 is still B.
    /// A missing or NaN score has no grade.
    pub fn from_score(score: Option<f64>) -> Option<Self> {
        let score = score.filter(|s| !s.is_nan())?;
        let grade = if score <= -1.0 {
            NutritionGrade::A
        } else if score <= 2.0 {
            NutritionGrade::B
        } else if score <= 10.0 {
            NutritionGrade::C
        } else if score <= 18.0 {
            NutritionGrade::D
        } else {
            NutritionGrade::E
        };
        Some(grade)
    }
}

impl Display for NutritionGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            NutritionGrade::A => "A",
            NutritionGrade::B => "B",
            NutritionGrade::C => "C",
            NutritionGrade::D => "D",
            NutritionGrade::E => "E",
        };
        write!(f, "{}", letter)
    }
}

/// Coerces a raw catalog value into a nutrition score.
///
/// Anything that is not a finite number becomes `None`, so a missing
/// score can never be compared as if it were zero.
pub fn parse_score(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(sanitize_score)
}

/// Drops NaN and infinities.
pub fn sanitize_score(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Rounds a similarity to three decimal places for output
pub fn round_similarity(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
