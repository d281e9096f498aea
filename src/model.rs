use crate::config::OcrParams;
use image::GrayImage;

/// A single OCR call: the normalized bitmap plus the recognition settings.
pub struct OcrRequest {
    pub image: GrayImage,
    pub params: OcrParams,
}

impl OcrRequest {
    /// Lightweight description of the request, kept for telemetry after the
    /// image itself has been consumed.
    pub fn metadata(&self) -> OcrRequestMetadata {
        OcrRequestMetadata {
            width: self.image.width(),
            height: self.image.height(),
            psm: self.params.page_seg_mode.as_psm(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OcrRequestMetadata {
    pub width: u32,
    pub height: u32,
    pub psm: u8,
}

/// Best-effort text produced by the OCR engine.
pub struct OcrResponse {
    pub text: String,
}

/// Trait for OCR backends that can be driven by the [`OcrEngine`](crate::OcrEngine).
///
/// Implementations are moved onto the engine's worker thread, so `run` may
/// block and may keep mutable state between calls.
pub trait OcrModel {
    /// The error type returned when the backend cannot be invoked.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Recognizes the text in the request's image.
    ///
    /// Returning an empty string is not an error: it means nothing was read.
    fn run(&mut self, request: OcrRequest) -> Result<OcrResponse, Self::Error>;
}
