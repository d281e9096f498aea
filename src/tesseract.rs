use crate::config::OcrParams;
use crate::model::{OcrModel, OcrRequest, OcrResponse};
use image::{GrayImage, ImageFormat};
use std::{
    io::{Cursor, Write},
    path::PathBuf,
    process::{Command, ExitStatus, Stdio},
    string::FromUtf8Error,
};

#[derive(Debug, thiserror::Error)]
pub enum TesseractError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to run {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to talk to tesseract: {0}")]
    Io(#[from] std::io::Error),

    #[error("tesseract {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("tesseract produced invalid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// [`OcrModel`] that shells out to the `tesseract` executable.
///
/// The image is streamed as PNG on stdin and the text is read back from
/// stdout, so no temporary files are involved.
pub struct TesseractModel {
    cmd: PathBuf,
}

impl TesseractModel {
    pub fn new(cmd: impl Into<PathBuf>) -> Self {
        Self { cmd: cmd.into() }
    }

    fn recognize(&self, image: &GrayImage, params: &OcrParams) -> Result<String, TesseractError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.cmd)
            .args(build_args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TesseractError::Spawn {
                cmd: self.cmd.display().to_string(),
                source,
            })?;

        // tesseract reads the whole image before writing anything
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(TesseractError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

impl OcrModel for TesseractModel {
    type Error = TesseractError;

    fn run(&mut self, request: OcrRequest) -> Result<OcrResponse, Self::Error> {
        let text = self.recognize(&request.image, &request.params)?;
        Ok(OcrResponse { text })
    }
}

/// Command-line arguments for a stdin-to-stdout recognition run.
pub fn build_args(params: &OcrParams) -> Vec<String> {
    vec![
        "stdin".to_string(),
        "stdout".to_string(),
        "--psm".to_string(),
        params.page_seg_mode.as_psm().to_string(),
        "-c".to_string(),
        format!("tessedit_char_whitelist={}", params.char_whitelist),
    ]
}

fn encode_png(image: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
