use std::sync::LazyLock;

use regex::Regex;

use crate::answers::AnswerStore;

pub const WEIGHT_ID: &str = "weight";
pub const HEIGHT_ID: &str = "height";
/// Derived answer key holding the rounded BMI.
pub const BMI_ID: &str = "bmi";
/// Minimum BMI accepted for treatment.
pub const BMI_THRESHOLD: f64 = 25.0;

static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid pattern")
});

/// Reads the numeric prefix of `raw` ("150 lbs" reads as 150).
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    LEADING_FLOAT
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse().ok())
}

/// Imperial BMI from pounds and inches. Missing, non-numeric or zero inputs yield 0.
pub fn calculate(weight: &str, height: &str) -> f64 {
    let weight = parse_leading_float(weight).unwrap_or(0.0);
    let height = parse_leading_float(height).unwrap_or(0.0);
    if weight == 0.0 || height == 0.0 {
        return 0.0;
    }
    weight / (height * height) * 703.0
}

/// Unrounded BMI from the current weight and height answers.
pub fn from_answers(answers: &AnswerStore) -> f64 {
    calculate(
        answers.scalar(WEIGHT_ID).unwrap_or_default(),
        answers.scalar(HEIGHT_ID).unwrap_or_default(),
    )
}

/// One-decimal rendering used for the stored answer and messages.
pub fn format(bmi: f64) -> String {
    format!("{:.1}", bmi)
}
