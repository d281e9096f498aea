use axum::http::StatusCode;

/// Failures of the captcha pipeline, one variant per stage.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// The upload is missing, not an image, or cannot be decoded.
    #[error("{0}")]
    InvalidInput(String),

    /// The upload exceeds the configured body limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The OCR engine could not be invoked or failed while running.
    #[error("OCR processing failed: {0}")]
    OcrFailure(String),

    /// No operand pair could be found in the recognized text.
    #[error("Could not extract multiplication problem from image. Found text: '{text}'")]
    ExtractionFailure { text: String },

    /// The extracted operands are not valid base-10 integers.
    #[error("Could not convert extracted numbers to integers: {first}, {second}")]
    ConversionFailure { first: String, second: String },

    #[error("Error processing image: {0}")]
    Internal(String),
}

impl SolverError {
    /// HTTP status surfaced to the caller for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SolverError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SolverError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            SolverError::ExtractionFailure { .. } | SolverError::ConversionFailure { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SolverError::OcrFailure(_) | SolverError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
