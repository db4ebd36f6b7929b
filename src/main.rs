use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use comfy_webui::{
    api,
    comfyui,
    config,
    workflow,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration before tracing so RUST_LOG from .env applies
    config::Config::dotenv_load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("comfy_webui=info,tower_http=info")),
        )
        .init();

    let config = config::Config::from_env();
    config.log_summary();

    let comfyui_client = comfyui::client::ComfyUIClient::new(config.comfyui_url.clone());
    let workflow_builder = workflow::WorkflowBuilder::from_config(&config).await?;

    let state = Arc::new(api::routes::AppState {
        comfyui_client,
        workflow_builder,
        output_dir: config.output_dir.clone(),
        health_timeout: config.health_timeout,
    });
    let app = api::routes::router(state);

    let socket_address = config.socket_addr();
    tracing::info!("Image generator UI listening on http://{}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
