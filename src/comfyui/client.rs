//! Thin HTTP client for ComfyUI endpoints.
//!
//! - `queue_prompt` posts a graph to `/prompt`.
//! - `get_history` fetches `/history/{prompt_id}` as JSON.
//! - `get_image` proxies to `/view?filename=...` and returns raw bytes.
//! - `ping` checks `/system_stats` within a timeout.
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::comfyui::history::{job_status, JobStatus};
use crate::error::{AppError, AppResult};

/// ComfyUI's answer to `POST /prompt`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    pub prompt_id: Option<String>,
    pub number: Option<u64>,
    #[serde(default)]
    pub node_errors: Value,
}

#[derive(Clone)]
pub struct ComfyUIClient {
    client: Client,
    base_url: String,
    client_id: String,
}

impl ComfyUIClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        ComfyUIClient {
            client: Client::new(),
            base_url: base,
            client_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Queue a graph with ComfyUI.
    ///
    /// The graph is wrapped as `{"prompt": graph, "client_id": ..}`. A missing
    /// `prompt_id` in the reply is left for the caller to judge.
    pub async fn queue_prompt(&self, graph: &Value) -> AppResult<QueueResponse> {
        let url = format!("{}/prompt", self.base_url);
        tracing::info!("Sending prompt to ComfyUI at URL: {}", url);
        tracing::debug!("Prompt payload: {}", graph);

        let body = json!({ "prompt": graph, "client_id": self.client_id });
        let response = self.client.post(&url).json(&body).send().await?;

        if response.status().is_success() {
            let queued: QueueResponse = response.json().await.map_err(undecodable)?;
            tracing::info!(prompt_id = ?queued.prompt_id, number = ?queued.number, "Successfully queued prompt");
            Ok(queued)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Failed to queue prompt. Status: {}, Body: {}", status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::ComfyUI(error_message))
        }
    }

    /// Retrieve the execution history of one prompt.
    pub async fn get_history(&self, prompt_id: &str) -> AppResult<Value> {
        validate_prompt_id(prompt_id)?;
        let url = format!("{}/history/{}", self.base_url, prompt_id);
        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            response.json().await.map_err(undecodable)
        } else {
            Err(AppError::ComfyUI(format!("Failed to get history: {:?}", response.status())))
        }
    }

    /// One poll step: fetch history and reduce it to a [`JobStatus`].
    pub async fn job_status(&self, prompt_id: &str) -> AppResult<JobStatus> {
        let history = self.get_history(prompt_id).await?;
        job_status(&history, prompt_id)
    }

    /// Fetch image bytes by filename via ComfyUI's `/view` endpoint.
    pub async fn get_image(&self, filename: &str) -> AppResult<Vec<u8>> {
        let url = format!("{}/view", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("filename", filename), ("type", "output")])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(AppError::ComfyUI(format!("Failed to get image: {:?}", response.status())))
        }
    }

    /// `true` when `/system_stats` answers 2xx within `timeout`.
    pub async fn ping(&self, timeout: Duration) -> bool {
        let url = format!("{}/system_stats", self.base_url);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ComfyUI health probe failed");
                false
            }
        }
    }
}

// ComfyUI answered, so a body we cannot parse is its fault, not the network's.
fn undecodable(e: reqwest::Error) -> AppError {
    AppError::ComfyUI(format!("Unreadable response from ComfyUI: {}", e))
}

// ComfyUI ids are uuids; anything else would be spliced into the URL path.
fn validate_prompt_id(prompt_id: &str) -> AppResult<()> {
    if !prompt_id.is_empty() && prompt_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid prompt id '{}'", prompt_id)))
    }
}
