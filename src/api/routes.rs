//! Router wiring and shared handler state.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::comfyui::client::ComfyUIClient;
use crate::workflow::WorkflowBuilder;

pub struct AppState {
    pub comfyui_client: ComfyUIClient,
    pub workflow_builder: WorkflowBuilder,
    pub output_dir: PathBuf,
    pub health_timeout: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/generate", post(handlers::generate))
        .route("/status/:prompt_id", get(handlers::status))
        .route("/image/:filename", get(handlers::get_image))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
