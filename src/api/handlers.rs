//! Axum request handlers for the browser-facing API.
use std::path::{Component, Path as FsPath};
use std::sync::Arc;

use axum::body::StreamBody;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::workflow::GenerationParams;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Build the graph from the posted parameters and enqueue it.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let params = GenerationParams::from_json(payload)?;
    let workflow = state.workflow_builder.build(&params)?;

    let queued = state.comfyui_client.queue_prompt(&workflow.graph).await?;
    match queued.prompt_id {
        Some(prompt_id) => {
            tracing::info!(prompt_id = %prompt_id, seed = workflow.seed, "generation queued");
            Ok(Json(json!({
                "prompt_id": prompt_id,
                "status": "queued",
                "seed": workflow.seed
            }))
            .into_response())
        }
        None => {
            tracing::error!(node_errors = %queued.node_errors, "ComfyUI accepted the prompt without a prompt_id");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to queue prompt" })),
            )
                .into_response())
        }
    }
}

/// Poll target for the browser. Failures are reported in-band with 200.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(prompt_id): Path<String>,
) -> Response {
    match state.comfyui_client.job_status(&prompt_id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            tracing::warn!(prompt_id = %prompt_id, error = %e, "status check failed");
            Json(json!({ "status": "error", "error": e.to_string() })).into_response()
        }
    }
}

pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if !is_plain_filename(&filename) {
        tracing::warn!(filename = %filename, "rejected image path");
        return Ok(image_not_found());
    }
    let path = state.output_dir.join(&filename);
    let size = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Ok(image_not_found()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(image_not_found()),
        Err(e) => return Err(AppError::Io(e)),
    };
    let file = tokio::fs::File::open(&path).await?;
    tracing::debug!(path = %path.display(), size, "streaming image");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        StreamBody::new(ReaderStream::new(file)),
    )
        .into_response())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let connected = state.comfyui_client.ping(state.health_timeout).await;
    Json(json!({
        "status": "ok",
        "comfyui": if connected { "connected" } else { "disconnected" }
    }))
}

fn image_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Image not found").into_response()
}

fn is_plain_filename(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return false;
    }
    let mut components = FsPath::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}
