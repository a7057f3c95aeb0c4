//! HTTP surface.
//!
//! Single submission endpoint plus the health/metrics pair. The upload
//! handler is the consumer half of the pipeline protocol: validate, write
//! the image, publish the trigger event, then poll the store for the
//! derived article key.

use crate::config::Config;
use crate::dispatch::EventBus;
use crate::events::TriggerEvent;
use crate::keys;
use crate::metrics;
use crate::poll::{self, WaitOutcome};
use crate::store::ObjectStore;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub bus: EventBus,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Prometheus metrics endpoint
async fn metrics_handler() -> String {
    metrics::export_metrics()
}

/// User-facing outcome of one submission.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadResponse {
    fn failure(outcome: &'static str, message: impl Into<String>) -> Self {
        Self {
            outcome,
            title: None,
            article: None,
            image_key: None,
            message: Some(message.into()),
        }
    }
}

struct Submission {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn read_submission(multipart: &mut Multipart) -> Result<Option<Submission>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("malformed multipart body: {}", e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("failed to read upload: {}", e))?
            .to_vec();
        return Ok(Some(Submission {
            filename,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<UploadResponse>) {
    let request_id = uuid::Uuid::new_v4();
    let start = Instant::now();
    info!(%request_id, "new upload request received");

    let submission = match read_submission(&mut multipart).await {
        Ok(Some(submission)) => submission,
        Ok(None) => {
            metrics::UPLOADS_REJECTED
                .with_label_values(&["empty_submission"])
                .inc();
            return (
                StatusCode::BAD_REQUEST,
                Json(UploadResponse::failure("empty-submission", "no file part")),
            );
        }
        Err(message) => {
            metrics::UPLOADS_REJECTED
                .with_label_values(&["empty_submission"])
                .inc();
            return (
                StatusCode::BAD_REQUEST,
                Json(UploadResponse::failure("empty-submission", message)),
            );
        }
    };

    if submission.filename.is_empty() || submission.bytes.is_empty() {
        metrics::UPLOADS_REJECTED
            .with_label_values(&["empty_submission"])
            .inc();
        return (
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::failure("empty-submission", "no selected file")),
        );
    }

    // Extension and filename checks happen before any store interaction
    if !keys::allowed_extension(&submission.filename) {
        metrics::UPLOADS_REJECTED
            .with_label_values(&["invalid_file_type"])
            .inc();
        return (
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::failure(
                "invalid-file-type",
                format!("file type not allowed: {}", submission.filename),
            )),
        );
    }
    let Some(filename) = keys::sanitize_filename(&submission.filename) else {
        metrics::UPLOADS_REJECTED
            .with_label_values(&["invalid_file_type"])
            .inc();
        return (
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::failure(
                "invalid-file-type",
                "filename is not usable",
            )),
        );
    };

    let bucket = &state.config.store_config.bucket;
    let image_key = keys::image_key(&filename);
    let article_key = keys::article_key(&image_key);

    if let Err(err) = state
        .store
        .put(bucket, &image_key, submission.bytes, &submission.content_type)
        .await
    {
        error!(%request_id, bucket, key = %image_key, error = %err, "image upload failed");
        return (
            StatusCode::BAD_GATEWAY,
            Json(UploadResponse::failure("store-error", err.to_string())),
        );
    }
    metrics::UPLOADS_ACCEPTED.inc();
    info!(
        %request_id,
        key = %image_key,
        elapsed_s = start.elapsed().as_secs_f64(),
        "image written to store"
    );

    let event = TriggerEvent::for_object(bucket, &image_key);
    if !state.bus.publish(event.to_json()) {
        error!(%request_id, "event bus is closed, cannot trigger pipeline");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(UploadResponse::failure(
                "internal-error",
                "pipeline is not accepting work",
            )),
        );
    }

    let wait = poll::wait_for_object(
        state.store.as_ref(),
        bucket,
        &article_key,
        state.config.poll_config.wait_timeout(),
        state.config.poll_config.interval(),
    )
    .await;
    info!(
        %request_id,
        key = %article_key,
        elapsed_s = start.elapsed().as_secs_f64(),
        "wait for article finished"
    );

    match wait {
        WaitOutcome::Found(_) => {}
        WaitOutcome::TimedOut => {
            warn!(%request_id, key = %article_key, "timed out waiting for article generation");
            return (
                StatusCode::GATEWAY_TIMEOUT,
                Json(UploadResponse {
                    outcome: "timeout",
                    title: None,
                    article: None,
                    image_key: Some(image_key),
                    message: Some("timed out waiting for article generation".to_string()),
                }),
            );
        }
        WaitOutcome::StoreFailed(err) => {
            error!(%request_id, key = %article_key, error = %err, "store failed while waiting");
            return (
                StatusCode::BAD_GATEWAY,
                Json(UploadResponse::failure("store-error", err.to_string())),
            );
        }
    }

    match poll::fetch_article(state.store.as_ref(), bucket, &article_key).await {
        Ok(article) => {
            info!(
                %request_id,
                key = %article_key,
                elapsed_s = start.elapsed().as_secs_f64(),
                "upload processed"
            );
            (
                StatusCode::OK,
                Json(UploadResponse {
                    outcome: "ok",
                    title: Some(article.title),
                    article: Some(article.body),
                    image_key: Some(image_key),
                    message: None,
                }),
            )
        }
        Err(err) => {
            error!(%request_id, key = %article_key, error = %err, "article fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(UploadResponse::failure("store-error", err.to_string())),
            )
        }
    }
}
