use argh::FromArgs;
use captcha_solver::{
    CaptchaSolver, OcrEngine, OcrParams, PageSegMode, SolverConfig, TesseractModel,
    config::{DEFAULT_MAX_UPLOAD_BYTES, resolve_tesseract_cmd},
    router,
};
use std::{path::PathBuf, sync::Arc};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Captcha solver: answers multiplication captchas uploaded over HTTP.
struct SolverArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on (defaults to $PORT, then 3000)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// path to the tesseract executable (defaults to $TESSERACT_CMD)
    #[argh(option)]
    tesseract_cmd: Option<PathBuf>,

    /// page segmentation mode: 7 for a single line, 8 for a single word
    #[argh(option, default = "7")]
    psm: u8,

    /// largest accepted upload in bytes
    #[argh(option, default = "DEFAULT_MAX_UPLOAD_BYTES")]
    max_upload_bytes: usize,
}

impl SolverArgs {
    fn into_config(self) -> Result<(String, u16, SolverConfig), Box<dyn std::error::Error>> {
        let port = match self.port {
            Some(port) => port,
            None => match std::env::var("PORT") {
                Ok(port) => port.parse()?,
                Err(_) => DEFAULT_PORT,
            },
        };

        let page_seg_mode = PageSegMode::from_psm(self.psm)
            .ok_or_else(|| format!("Unsupported page segmentation mode: {}", self.psm))?;

        let tesseract_cmd = self
            .tesseract_cmd
            .or_else(|| std::env::var_os("TESSERACT_CMD").map(PathBuf::from));

        let config = SolverConfig {
            tesseract_cmd: resolve_tesseract_cmd(tesseract_cmd),
            ocr: OcrParams {
                page_seg_mode,
                ..OcrParams::default()
            },
            max_upload_bytes: self.max_upload_bytes,
        };

        Ok((self.host, port, config))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: SolverArgs = argh::from_env();

    let (host, port, config) = args.into_config()?;

    // format the host and port
    let addr = format!("{}:{}", host, port);

    log::info!("Using tesseract: {}", config.tesseract_cmd.display());
    let engine = OcrEngine::new(TesseractModel::new(config.tesseract_cmd.clone()))?;
    let solver = Arc::new(CaptchaSolver::new(engine, config.ocr.clone()));

    let app = router(solver, config.max_upload_bytes);

    log::info!("🚀 Starting the captcha solver");
    log::info!("🔥 Listening on: {}", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
