use crate::config::{HEALTH_MESSAGE, RESPONSE_EMAIL};
use crate::error::SolverError;
use crate::solver::CaptchaSolver;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, State,
        multipart::{Multipart, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Name of the multipart field carrying the captcha image.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolveResponse {
    pub answer: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for SolverError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Error processing image: {self}");
        } else {
            log::warn!("Rejected captcha request ({status}): {self}");
        }

        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Builds the HTTP application around a shared solver.
///
/// `GET /` answers the health check, `POST /` solves an uploaded captcha.
pub fn router(solver: Arc<CaptchaSolver>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_check).post(solve_captcha))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(solver)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: HEALTH_MESSAGE.to_string(),
    })
}

async fn solve_captcha(
    State(solver): State<Arc<CaptchaSolver>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SolveResponse>, SolverError> {
    let multipart = multipart.map_err(|e| upload_error(e.status(), e.body_text()))?;
    let image_bytes = read_image_field(multipart).await?;

    let solution = solver.solve(&image_bytes).await?;

    Ok(Json(SolveResponse {
        answer: solution.answer(),
        email: RESPONSE_EMAIL.to_string(),
    }))
}

/// Returns the bytes of the upload field, rejecting anything not declared as
/// an image before it reaches the decoder.
async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, SolverError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(SolverError::InvalidInput("File must be an image".to_string()));
        }

        return field
            .bytes()
            .await
            .map_err(|e| upload_error(e.status(), e.body_text()));
    }

    Err(SolverError::InvalidInput(format!(
        "Missing '{UPLOAD_FIELD}' upload field"
    )))
}

/// Keeps the body-limit status of multipart failures, everything else is a
/// bad upload.
fn upload_error(status: StatusCode, message: String) -> SolverError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        SolverError::PayloadTooLarge(message)
    } else {
        SolverError::InvalidInput(message)
    }
}
