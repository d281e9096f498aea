//! HTTP service that reads multiplication captchas and answers them.
//!
//! An uploaded image is decoded to grayscale, recognized by an [`OcrModel`]
//! running on the [`OcrEngine`] worker thread, and the two operands found in
//! the text are multiplied with arbitrary precision.

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod server;
pub mod solver;
pub mod tesseract;

pub use config::{OcrParams, PageSegMode, SolverConfig};
pub use engine::{OcrEngine, OcrEngineError, OcrEngineResponse, OcrEngineState};
pub use error::SolverError;
pub use extract::{ExtractionStrategy, OperandPair, extract_operands};
pub use model::{OcrModel, OcrRequest, OcrRequestMetadata, OcrResponse};
pub use server::{ErrorResponse, HealthResponse, SolveResponse, router};
pub use solver::{CaptchaSolver, Solution, evaluate};
pub use tesseract::{TesseractError, TesseractModel};
