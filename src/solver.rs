use crate::config::OcrParams;
use crate::decode::decode_grayscale;
use crate::engine::{OcrEngine, OcrEngineError};
use crate::error::SolverError;
use crate::extract::{ExtractionStrategy, extract_operands};
use crate::model::OcrRequest;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use regex::Regex;

static DECIMAL_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Nd}$").expect("valid decimal digit regex"));

/// Outcome of a solved captcha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub first: BigUint,
    pub second: BigUint,
    pub product: BigUint,
    pub strategy: ExtractionStrategy,
}

impl Solution {
    /// Decimal rendering of the product, as returned to callers.
    pub fn answer(&self) -> String {
        self.product.to_string()
    }
}

impl From<OcrEngineError> for SolverError {
    fn from(err: OcrEngineError) -> Self {
        match err {
            OcrEngineError::Model(source) => SolverError::OcrFailure(source.to_string()),
            stopped @ OcrEngineError::Stopped => SolverError::Internal(stopped.to_string()),
        }
    }
}

/// The decode, recognize, extract and multiply pipeline.
pub struct CaptchaSolver {
    engine: OcrEngine,
    params: OcrParams,
}

impl CaptchaSolver {
    pub fn new(engine: OcrEngine, params: OcrParams) -> Self {
        Self { engine, params }
    }

    /// Solves the captcha contained in an encoded image.
    pub async fn solve(&self, image_bytes: &[u8]) -> Result<Solution, SolverError> {
        let image = decode_grayscale(image_bytes)?;

        log::debug!(
            "Queueing {}x{} image, OCR engine is {}",
            image.width(),
            image.height(),
            self.engine.state().as_str()
        );
        let response = self
            .engine
            .recognize(OcrRequest {
                image,
                params: self.params.clone(),
            })
            .await?;

        log::debug!(
            "OCR request {} on {}x{} image took {:?}",
            response.id,
            response.request_metadata.width,
            response.request_metadata.height,
            response.duration
        );

        let text = response.text.trim();
        log::info!("Extracted text: {text}");

        evaluate(text)
    }
}

/// Extracts the operands from recognized text and multiplies them.
pub fn evaluate(text: &str) -> Result<Solution, SolverError> {
    let operands = extract_operands(text).ok_or_else(|| SolverError::ExtractionFailure {
        text: text.to_string(),
    })?;

    let (first, second) = match (
        parse_operand(&operands.first),
        parse_operand(&operands.second),
    ) {
        (Some(first), Some(second)) => (first, second),
        _ => {
            return Err(SolverError::ConversionFailure {
                first: operands.first,
                second: operands.second,
            });
        }
    };

    let product = &first * &second;
    log::info!(
        "Calculation: {first} × {second} = {product} ({})",
        operands.strategy.as_str()
    );

    Ok(Solution {
        first,
        second,
        product,
        strategy: operands.strategy,
    })
}

/// Parses a base-10 operand written in any Unicode decimal digits.
fn parse_operand(s: &str) -> Option<BigUint> {
    let digits = s
        .chars()
        .map(|c| decimal_digit_value(c).and_then(|value| char::from_digit(value, 10)))
        .collect::<Option<String>>()?;

    if digits.is_empty() {
        return None;
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
}

/// Value of a Unicode `Nd` character.
///
/// Decimal digits are encoded in contiguous runs whose length is a multiple
/// of ten and which start at a zero, so the offset inside the run gives the
/// value.
fn decimal_digit_value(c: char) -> Option<u32> {
    if let Some(value) = c.to_digit(10) {
        return Some(value);
    }
    if !is_decimal_digit(c) {
        return None;
    }

    let mut offset = 0;
    let mut code = c as u32;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        code -= 1;
    }
    Some(offset % 10)
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT_RE.is_match(c.encode_utf8(&mut buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplies_eight_digit_operands() {
        let solution = evaluate("12345678x87654321").unwrap();
        assert_eq!(solution.answer(), (12345678u128 * 87654321u128).to_string());
        assert_eq!(solution.strategy, ExtractionStrategy::StrictEightDigit);
    }

    #[test]
    fn short_operands_still_multiply() {
        let solution = evaluate("12 × 34").unwrap();
        assert_eq!(solution.answer(), "408");
        assert_eq!(solution.strategy, ExtractionStrategy::DigitRun);
    }

    #[test]
    fn split_fallback_multiplies_first_two_runs() {
        let solution = evaluate("abc123xdef456").unwrap();
        assert_eq!(solution.answer(), "56088");
        assert_eq!(solution.first, BigUint::from(123u32));
        assert_eq!(solution.second, BigUint::from(456u32));
    }

    #[test]
    fn largest_eight_digit_product_is_exact() {
        let solution = evaluate("99999999×99999999").unwrap();
        assert_eq!(solution.answer(), "9999999800000001");
    }

    #[test]
    fn operands_beyond_128_bits_are_exact() {
        let a = "123456789012345678901234567890123456789012";
        let b = "987654321098765432109876543210987654321098";
        let solution = evaluate(&format!("{a}x{b}")).unwrap();

        let expected = a.parse::<BigUint>().unwrap() * b.parse::<BigUint>().unwrap();
        assert_eq!(solution.product, expected);
        assert_eq!(
            solution.answer(),
            "121932631137021795226185032733866788594511071482512624295040014144182876585886175176"
        );
    }

    #[test]
    fn text_without_digits_is_an_extraction_failure() {
        let err = evaluate("+=+").unwrap_err();
        assert!(matches!(err, SolverError::ExtractionFailure { ref text } if text == "+=+"));
        assert!(err.to_string().contains("'+=+'"));
    }

    #[test]
    fn non_ascii_decimal_digits_convert() {
        let solution = evaluate("١٢x٣٤").unwrap();
        assert_eq!(solution.answer(), "408");

        let solution = evaluate("１２ × ３４").unwrap();
        assert_eq!(solution.answer(), "408");
    }

    #[test]
    fn adjacent_digit_runs_keep_their_values() {
        // mathematical digits are five runs of ten packed back to back
        let solution = evaluate("𝟡𝟡x𝟙𝟚").unwrap();
        assert_eq!(solution.first, BigUint::from(99u32));
        assert_eq!(solution.second, BigUint::from(12u32));
        assert_eq!(solution.answer(), "1188");
    }

    #[test]
    fn operands_must_be_decimal_digits() {
        assert_eq!(parse_operand(""), None);
        assert_eq!(parse_operand("12a"), None);
        assert_eq!(parse_operand("²"), None);
        assert_eq!(parse_operand("007"), Some(BigUint::from(7u32)));
    }

    #[test]
    fn engine_errors_map_to_solver_errors() {
        let model_err: Box<dyn std::error::Error + Send + Sync> = "exit status 1".into();
        assert!(matches!(
            SolverError::from(OcrEngineError::Model(model_err)),
            SolverError::OcrFailure(msg) if msg == "exit status 1"
        ));
        assert!(matches!(
            SolverError::from(OcrEngineError::Stopped),
            SolverError::Internal(_)
        ));
    }
}
