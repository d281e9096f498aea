//! Operand extraction from recognized captcha text.
//!
//! OCR output is noisy, so several strategies are tried from the most to the
//! least specific. Each one is a pure function of the text.

use once_cell::sync::Lazy;
use regex::Regex;

static STRICT_EIGHT_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{8})\s*[×*x]\s*(\d{8})").expect("valid strict operand regex"));

static DIGIT_RUN_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[×*x]\s*(\d+)").expect("valid operand regex"));

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit regex"));

/// Separators tried, in order, by the split fallback.
pub const SPLIT_SEPARATORS: [char; 4] = ['×', '*', 'x', 'X'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Two runs of exactly eight digits around a multiplication sign.
    StrictEightDigit,
    /// Two digit runs of any length around a multiplication sign.
    DigitRun,
    /// First two digit runs of the text split on a separator.
    SeparatorSplit,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::StrictEightDigit => "strict-eight-digit",
            ExtractionStrategy::DigitRun => "digit-run",
            ExtractionStrategy::SeparatorSplit => "separator-split",
        }
    }
}

/// The two operand strings found in the recognized text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperandPair {
    pub first: String,
    pub second: String,
    pub strategy: ExtractionStrategy,
}

type Strategy = fn(&str) -> Option<(String, String)>;

const STRATEGIES: [(ExtractionStrategy, Strategy); 3] = [
    (ExtractionStrategy::StrictEightDigit, strict_eight_digit),
    (ExtractionStrategy::DigitRun, digit_run),
    (ExtractionStrategy::SeparatorSplit, separator_split),
];

/// Runs every strategy in priority order and returns the first hit.
pub fn extract_operands(text: &str) -> Option<OperandPair> {
    STRATEGIES.iter().find_map(|(strategy, extract)| {
        extract(text).map(|(first, second)| OperandPair {
            first,
            second,
            strategy: *strategy,
        })
    })
}

pub fn strict_eight_digit(text: &str) -> Option<(String, String)> {
    capture_pair(&STRICT_EIGHT_DIGIT_RE, text)
}

pub fn digit_run(text: &str) -> Option<(String, String)> {
    capture_pair(&DIGIT_RUN_PAIR_RE, text)
}

/// Splits on the first separator that yields at least two digit runs and
/// returns the first two runs across all fragments.
///
/// Runs are not paired per fragment: `"1 2 X 3"` yields `("1", "2")`.
pub fn separator_split(text: &str) -> Option<(String, String)> {
    SPLIT_SEPARATORS
        .iter()
        .filter(|sep| text.contains(**sep))
        .find_map(|sep| {
            let mut runs = text
                .split(*sep)
                .flat_map(|fragment| DIGIT_RUN_RE.find_iter(fragment))
                .map(|m| m.as_str().to_string());

            match (runs.next(), runs.next()) {
                (Some(first), Some(second)) => Some((first, second)),
                _ => None,
            }
        })
}

fn capture_pair(re: &Regex, text: &str) -> Option<(String, String)> {
    let caps = re.captures(text)?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}
