use std::path::{Path, PathBuf};

/// Characters the OCR engine is allowed to emit.
pub const CHAR_WHITELIST: &str = "0123456789x*×=+";

/// Fixed contact address returned with every answer.
pub const RESPONSE_EMAIL: &str = "23f3004152@ds.study.iitm.ac.in";

/// Message returned by the health check.
pub const HEALTH_MESSAGE: &str = "CAPTCHA Solver API is running on Vercel";

/// Location of the system-wide Tesseract install on the hosting image.
pub const SYSTEM_TESSERACT_CMD: &str = "/usr/bin/tesseract";

/// Default upload limit for `POST /`.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Tesseract page segmentation modes the solver knows how to request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSegMode {
    /// Treat the image as a single text line.
    SingleLine,
    /// Treat the image as a single word.
    SingleWord,
}

impl PageSegMode {
    /// Returns the numeric `--psm` value understood by Tesseract.
    pub fn as_psm(&self) -> u8 {
        match self {
            PageSegMode::SingleLine => 7,
            PageSegMode::SingleWord => 8,
        }
    }

    pub fn from_psm(psm: u8) -> Option<Self> {
        match psm {
            7 => Some(PageSegMode::SingleLine),
            8 => Some(PageSegMode::SingleWord),
            _ => None,
        }
    }
}

/// Configuration handed to the OCR model when recognizing a captcha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OcrParams {
    pub page_seg_mode: PageSegMode,
    pub char_whitelist: String,
}

impl Default for OcrParams {
    fn default() -> Self {
        Self {
            page_seg_mode: PageSegMode::SingleLine,
            char_whitelist: CHAR_WHITELIST.to_string(),
        }
    }
}

/// Startup-time configuration of the solver service.
///
/// Everything here is resolved once in `main` and passed down; nothing is
/// re-read per request.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Path or name of the `tesseract` executable.
    pub tesseract_cmd: PathBuf,
    /// Parameters forwarded to every OCR call.
    pub ocr: OcrParams,
    /// Largest accepted request body for uploads.
    pub max_upload_bytes: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: resolve_tesseract_cmd(None),
            ocr: OcrParams::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Picks the Tesseract executable to run.
///
/// An explicit value wins; otherwise the system install is used when present,
/// falling back to a bare `tesseract` resolved through `PATH`.
pub fn resolve_tesseract_cmd(explicit: Option<PathBuf>) -> PathBuf {
    resolve_tesseract_cmd_with(explicit, Path::new(SYSTEM_TESSERACT_CMD))
}

fn resolve_tesseract_cmd_with(explicit: Option<PathBuf>, system: &Path) -> PathBuf {
    match explicit {
        Some(cmd) if !cmd.as_os_str().is_empty() => cmd,
        _ if system.exists() => system.to_path_buf(),
        _ => PathBuf::from("tesseract"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_command_takes_precedence() {
        let cmd = resolve_tesseract_cmd_with(
            Some(PathBuf::from("/opt/ocr/tesseract")),
            Path::new(SYSTEM_TESSERACT_CMD),
        );
        assert_eq!(cmd, PathBuf::from("/opt/ocr/tesseract"));
    }

    #[test]
    fn falls_back_to_path_lookup_without_system_install() {
        let cmd = resolve_tesseract_cmd_with(None, Path::new("/nonexistent/bin/tesseract"));
        assert_eq!(cmd, PathBuf::from("tesseract"));
    }

    #[test]
    fn empty_explicit_command_is_ignored() {
        let cmd = resolve_tesseract_cmd_with(
            Some(PathBuf::new()),
            Path::new("/nonexistent/bin/tesseract"),
        );
        assert_eq!(cmd, PathBuf::from("tesseract"));
    }

    #[test]
    fn uses_system_install_when_present() {
        // any path that exists will do
        let system = std::env::current_dir().unwrap();
        assert_eq!(resolve_tesseract_cmd_with(None, &system), system);
    }

    #[test]
    fn psm_round_trips_known_modes() {
        assert_eq!(PageSegMode::from_psm(7), Some(PageSegMode::SingleLine));
        assert_eq!(PageSegMode::SingleWord.as_psm(), 8);
        assert_eq!(PageSegMode::from_psm(3), None);
    }

    #[test]
    fn default_whitelist_covers_digits_and_operators() {
        let params = OcrParams::default();
        assert_eq!(params.page_seg_mode, PageSegMode::SingleLine);
        for c in "0123456789x*×=+".chars() {
            assert!(params.char_whitelist.contains(c));
        }
    }
}
