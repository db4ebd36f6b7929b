//! Env-driven configuration for the web UI and the CLI.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults match a stock local ComfyUI install.
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COMFYUI_URL: &str = "http://127.0.0.1:8188";
pub const DEFAULT_CHECKPOINT: &str = "sd_xl_base_1.0.safetensors";
pub const DEFAULT_FILENAME_PREFIX: &str = "webui";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub comfyui_url: String,
    pub output_dir: PathBuf,
    pub api_host: String,
    pub api_port: String,
    pub checkpoint_name: String,
    pub filename_prefix: String,
    pub workflow_template: Option<PathBuf>,
    pub health_timeout: Duration,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let output_dir = get("COMFYUI_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_output_dir(get("HOME")));

        let health_timeout = get("HEALTH_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS);

        Config {
            comfyui_url: get("COMFYUI_URL").unwrap_or_else(|| DEFAULT_COMFYUI_URL.to_string()),
            output_dir,
            api_host: get("API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            api_port: get("API_PORT").unwrap_or_else(|| DEFAULT_PORT.to_string()),
            checkpoint_name: get("CHECKPOINT_NAME").unwrap_or_else(|| DEFAULT_CHECKPOINT.to_string()),
            filename_prefix: get("FILENAME_PREFIX")
                .unwrap_or_else(|| DEFAULT_FILENAME_PREFIX.to_string()),
            workflow_template: get("WORKFLOW_TEMPLATE").map(PathBuf::from),
            health_timeout: Duration::from_secs(health_timeout),
        }
    }

    /// Resolve the listen address, falling back to 127.0.0.1:5000 on bad input.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip: IpAddr = self.api_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid API_HOST '{}', falling back to {}", self.api_host, DEFAULT_HOST);
            IpAddr::from([127, 0, 0, 1])
        });
        let port: u16 = self.api_port.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid API_PORT '{}', falling back to {}", self.api_port, DEFAULT_PORT);
            DEFAULT_PORT
        });
        SocketAddr::new(ip, port)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            comfyui_url = %self.comfyui_url,
            output_dir = %self.output_dir.display(),
            checkpoint = %self.checkpoint_name,
            filename_prefix = %self.filename_prefix,
            template = ?self.workflow_template,
            "configuration loaded"
        );
    }
}

fn default_output_dir(home: Option<String>) -> PathBuf {
    let home = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    home.join("local-ai-stack").join("ComfyUI").join("output")
}
