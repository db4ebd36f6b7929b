//! ComfyUI web front-end library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the server binary.
//! - `comfyui`: Thin client for ComfyUI REST endpoints and history parsing.
//! - `prompt`: Template construction with `{{placeholder}}` replacement.
//! - `workflow`: Generation parameters and the SDXL graph builder.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `ComfyUIClient`,
//! `GenerationParams` and `WorkflowBuilder`.
pub mod api;
pub mod comfyui;
pub mod prompt;
pub mod workflow;
pub mod config;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use comfyui::client::ComfyUIClient;
pub use error::{AppError, AppResult};
pub use workflow::{GenerationParams, WorkflowBuilder};
