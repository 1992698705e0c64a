//! HTTP server for metadata creation and validation.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                               |
//! |--------|-------------------|-------------------------------------------|
//! | GET    | `/health`         | Health check                              |
//! | POST   | `/api/metadata`   | Upload a metadata CSV, get files + report |
//! | POST   | `/api/validate`   | Validate metadata objects (JSON)          |
//! | GET    | `/api/logs`       | SSE stream for real-time logs             |
//!
//! Minting is not exposed here; it needs the supply key and runs from the CLI.

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse, ValidateRequest};
use crate::config::HeaderLayout;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::transform::pipeline::{create_metadata_from_rows, CreateMetadataOptions, MetadataSource};
use crate::validation::{validate_many, BatchValidationReport};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Each upload writes to `<output_root>/<job id>/`.
    pub output_root: PathBuf,
    /// Layout used when an upload does not send its own.
    pub layout: HeaderLayout,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) | ServerError::Pipeline(PipelineError::Csv(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/metadata", post(upload_metadata_csv))
        .route("/api/validate", post(validate_objects))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn start_server(port: u16, state: AppState) -> ServerResult<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("nftmint server running on http://localhost:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "nftmint",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "metadata": "POST /api/metadata",
            "validate": "POST /api/validate",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers just skip what they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart fields: `file` (the CSV, required) and `layout` (header layout
/// JSON, optional).
async fn upload_metadata_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut layout = state.layout.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "layout" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                layout = HeaderLayout::from_json(&text)
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?;
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    let job_id = Uuid::new_v4();
    log_info(format!(
        "New upload: {} ({} bytes), job {}",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        job_id
    ));

    let options = CreateMetadataOptions::new(
        MetadataSource::Bytes(bytes),
        state.output_root.join(job_id.to_string()),
    )
    .with_layout(layout);

    let report = tokio::task::spawn_blocking(move || create_metadata_from_rows(options))
        .await
        .map_err(|e| ServerError::Internal(format!("Job {} aborted: {}", job_id, e)))?
        .map_err(|e| {
            log_error(format!("Job {} failed: {}", job_id, e));
            ServerError::from(e)
        })?;

    Ok(Json(UploadResponse::new(job_id, report)))
}

async fn validate_objects(Json(request): Json<ValidateRequest>) -> Json<BatchValidationReport> {
    Json(validate_many(&request.objects, &request.attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_error_status_codes() {
        let response = ServerError::BadRequest("No file provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let csv = ServerError::Pipeline(PipelineError::Csv(crate::error::CsvError::EmptyFile));
        assert_eq!(csv.into_response().status(), StatusCode::BAD_REQUEST);

        let io = ServerError::Io(std::io::Error::other("disk full"));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_validate_handler() {
        let request: ValidateRequest = serde_json::from_value(json!({
            "objects": [
                { "name": "a", "image": "ipfs://a.png", "type": "image/png" },
                { "image": "ipfs://b.png", "type": "image/png" }
            ],
            "attributes": ["color"]
        }))
        .unwrap();

        let Json(report) = validate_objects(Json(request)).await;

        assert_eq!(report.metadata_objects_validation_errors.len(), 1);
        assert_eq!(report.metadata_objects_validation_errors[0].index, 1);
        assert_eq!(report.missing_attributes_errors.len(), 2);
    }

    #[tokio::test]
    async fn test_validate_handler_wrong_typed_object() {
        let request: ValidateRequest = serde_json::from_value(json!({
            "objects": [
                { "name": "a", "image": "ipfs://a.png", "type": "image/png" },
                { "name": 5, "image": "ipfs://b.png", "type": 7, "attributes": null }
            ]
        }))
        .unwrap();

        let Json(report) = validate_objects(Json(request)).await;

        assert_eq!(report.metadata_objects_validation_errors.len(), 1);
        let entry = &report.metadata_objects_validation_errors[0];
        assert_eq!(entry.index, 1);
        assert_eq!(
            entry.errors.general,
            vec![
                ValidationErrorKind::MissingName,
                ValidationErrorKind::InvalidType,
                ValidationErrorKind::InvalidAttributes,
            ]
        );
    }
}
