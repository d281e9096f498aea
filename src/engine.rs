use crate::model::{OcrModel, OcrRequest, OcrRequestMetadata};
use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tokio::sync::oneshot;

/// Represents the current state of the OCR engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OcrEngineState {
    /// Waiting for the next request.
    Idle,
    /// A request is being recognized.
    Processing,
}

impl OcrEngineState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngineState::Idle => "idle",
            OcrEngineState::Processing => "processing",
        }
    }
}

/// Errors surfaced by [`OcrEngine::recognize`].
#[derive(Debug, thiserror::Error)]
pub enum OcrEngineError {
    /// The model itself failed.
    #[error("{0}")]
    Model(Box<dyn std::error::Error + Send + Sync>),
    /// The worker thread is gone, either stopped or crashed.
    #[error("OCR engine is not running")]
    Stopped,
}

/// Response returned by the engine with the recognized text and telemetry data.
#[derive(Debug)]
pub struct OcrEngineResponse {
    /// Identifier assigned when the request was queued.
    pub id: u64,
    /// Time spent inside the model.
    pub duration: Duration,
    /// Metadata of the originating request.
    pub request_metadata: OcrRequestMetadata,
    /// Text produced by the model.
    pub text: String,
}

type Reply = oneshot::Sender<Result<OcrEngineResponse, OcrEngineError>>;

struct OcrEngineRequest {
    id: u64,
    request: OcrRequest,
    reply: Reply,
}

/// Runs an [`OcrModel`] on a dedicated thread.
///
/// Requests are queued and recognized one at a time, so backends that are
/// not reentrant can be shared by concurrent HTTP handlers. Callers await the
/// reply without blocking the async runtime.
pub struct OcrEngine {
    state: Arc<Mutex<OcrEngineState>>,
    req_tx: Option<mpsc::Sender<OcrEngineRequest>>,
    worker_handle: Option<JoinHandle<()>>,
    id_counter: AtomicU64,
}

impl OcrEngine {
    /// Creates a new engine and moves `model` onto its worker thread.
    pub fn new<M>(mut model: M) -> std::io::Result<Self>
    where
        M: OcrModel + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel::<OcrEngineRequest>();
        let state = Arc::new(Mutex::new(OcrEngineState::Idle));

        let worker_handle = std::thread::Builder::new()
            .name("ocr-engine".to_string())
            .spawn({
                let state = state.clone();
                move || {
                    while let Ok(req) = req_rx.recv() {
                        log::debug!("Scheduling OCR request {}", req.id);

                        // keep what we need for telemetry before the image is consumed
                        let request_metadata = req.request.metadata();

                        set_state(&state, OcrEngineState::Processing);
                        let start_time = Instant::now();

                        let result = model
                            .run(req.request)
                            .map(|response| OcrEngineResponse {
                                id: req.id,
                                duration: start_time.elapsed(),
                                request_metadata,
                                text: response.text,
                            })
                            .map_err(|e| OcrEngineError::Model(Box::new(e)));

                        log::debug!(
                            "OCR request {} completed in {:?}",
                            req.id,
                            start_time.elapsed()
                        );
                        set_state(&state, OcrEngineState::Idle);

                        // the caller may have hung up in the meantime
                        let _ = req.reply.send(result);
                    }
                    log::debug!("OCR engine worker exiting");
                }
            })?;

        Ok(Self {
            state,
            req_tx: Some(req_tx),
            worker_handle: Some(worker_handle),
            id_counter: AtomicU64::new(0),
        })
    }

    /// Returns the current state of the engine.
    pub fn state(&self) -> OcrEngineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `request` and waits for the model's answer.
    pub async fn recognize(
        &self,
        request: OcrRequest,
    ) -> Result<OcrEngineResponse, OcrEngineError> {
        let (reply, reply_rx) = oneshot::channel();
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);

        self.req_tx
            .as_ref()
            .ok_or(OcrEngineError::Stopped)?
            .send(OcrEngineRequest { id, request, reply })
            .map_err(|_| OcrEngineError::Stopped)?;

        reply_rx.await.map_err(|_| OcrEngineError::Stopped)?
    }

    /// Closes the request queue and waits for the worker to drain it.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.worker_handle.take() {
            if handle.join().is_err() {
                log::error!("OCR engine worker panicked");
            }
        }
    }
}

impl Drop for OcrEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn set_state(state: &Mutex<OcrEngineState>, new_state: OcrEngineState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = new_state;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrParams;
    use crate::model::OcrResponse;
    use image::GrayImage;

    #[derive(Debug, thiserror::Error)]
    #[error("scripted failure")]
    struct ScriptedError;

    struct Echo(Vec<Result<String, ScriptedError>>);

    impl OcrModel for Echo {
        type Error = ScriptedError;

        fn run(&mut self, _request: OcrRequest) -> Result<OcrResponse, Self::Error> {
            self.0.remove(0).map(|text| OcrResponse { text })
        }
    }

    fn request(width: u32, height: u32) -> OcrRequest {
        OcrRequest {
            image: GrayImage::new(width, height),
            params: OcrParams::default(),
        }
    }

    #[tokio::test]
    async fn recognizes_queued_requests_in_order() {
        let engine = OcrEngine::new(Echo(vec![Ok("1x2".into()), Ok("3x4".into())])).unwrap();

        let first = engine.recognize(request(8, 2)).await.unwrap();
        let second = engine.recognize(request(8, 2)).await.unwrap();

        assert_eq!(first.text, "1x2");
        assert_eq!(second.text, "3x4");
        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(engine.state(), OcrEngineState::Idle);
    }

    #[tokio::test]
    async fn keeps_request_metadata() {
        let engine = OcrEngine::new(Echo(vec![Ok(String::new())])).unwrap();

        let response = engine.recognize(request(120, 40)).await.unwrap();

        assert_eq!(
            response.request_metadata,
            OcrRequestMetadata {
                width: 120,
                height: 40,
                psm: 7
            }
        );
        assert!(response.text.is_empty());
    }

    #[tokio::test]
    async fn model_errors_do_not_kill_the_worker() {
        let engine = OcrEngine::new(Echo(vec![Err(ScriptedError), Ok("5x6".into())])).unwrap();

        let err = engine.recognize(request(1, 1)).await.unwrap_err();
        assert!(matches!(err, OcrEngineError::Model(_)));
        assert_eq!(err.to_string(), "scripted failure");

        let ok = engine.recognize(request(1, 1)).await.unwrap();
        assert_eq!(ok.text, "5x6");
    }

    #[tokio::test]
    async fn stopped_engine_rejects_requests() {
        let mut engine = OcrEngine::new(Echo(vec![])).unwrap();
        engine.stop();

        let err = engine.recognize(request(1, 1)).await.unwrap_err();
        assert!(matches!(err, OcrEngineError::Stopped));
    }

    #[test]
    fn state_names() {
        assert_eq!(OcrEngineState::Idle.as_str(), "idle");
        assert_eq!(OcrEngineState::Processing.as_str(), "processing");
    }
}
