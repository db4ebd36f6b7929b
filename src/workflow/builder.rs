//! Maps [`GenerationParams`] onto a ComfyUI API-format graph.
//!
//! The built-in template is the seven-node SDXL text-to-image graph in
//! `prompts/sdxl.json`. A different file can be supplied through
//! `WORKFLOW_TEMPLATE` as long as it uses the same placeholder names.
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::config::{Config, DEFAULT_CHECKPOINT, DEFAULT_FILENAME_PREFIX};
use crate::error::{AppError, AppResult};
use crate::prompt::constructor::PromptConstructor;
use crate::workflow::params::GenerationParams;

const SDXL_TEMPLATE: &str = include_str!("../../prompts/sdxl.json");

/// A rendered graph plus the seed that went into it.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub graph: Value,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    template: Value,
    checkpoint_name: String,
    filename_prefix: String,
    constructor: PromptConstructor,
}

impl WorkflowBuilder {
    /// Builder over the embedded SDXL template with stock defaults.
    pub fn sdxl() -> AppResult<Self> {
        let template: Value = serde_json::from_str(SDXL_TEMPLATE)?;
        Self::with_template(template)
    }

    pub fn with_template(template: Value) -> AppResult<Self> {
        let constructor = PromptConstructor::new();
        constructor.validate_template(&template)?;
        Ok(WorkflowBuilder {
            template,
            checkpoint_name: DEFAULT_CHECKPOINT.to_string(),
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
            constructor,
        })
    }

    pub async fn from_file(path: &Path) -> AppResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::PromptConstruction(format!(
                "Failed to read workflow template {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut template: Value = serde_json::from_str(&content)?;
        // Accept files saved as a full `/prompt` body too.
        let wrapped = template.get_mut("prompt").map(Value::take);
        if let Some(inner) = wrapped {
            template = inner;
        }
        Self::with_template(template)
    }

    /// Load the configured template (or the built-in one) and apply the
    /// configured checkpoint and filename prefix.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let builder = match &config.workflow_template {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading workflow template");
                Self::from_file(path).await?
            }
            None => Self::sdxl()?,
        };
        Ok(builder
            .checkpoint(config.checkpoint_name.clone())
            .filename_prefix(config.filename_prefix.clone()))
    }

    pub fn checkpoint(mut self, name: impl Into<String>) -> Self {
        self.checkpoint_name = name.into();
        self
    }

    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    pub fn build(&self, params: &GenerationParams) -> AppResult<Workflow> {
        params.validate()?;
        let seed = resolve_seed(params.seed);
        let inputs = json!({
            "ckpt_name": self.checkpoint_name,
            "positive": params.prompt,
            "negative": params.negative,
            "width": params.width,
            "height": params.height,
            "seed": seed,
            "steps": params.steps,
            "cfg": params.cfg,
            "filename_prefix": self.filename_prefix,
        });
        let graph = self.constructor.construct_prompt(&self.template, &inputs)?;
        tracing::debug!(seed, steps = params.steps, width = params.width, height = params.height, "built workflow");
        Ok(Workflow { graph, seed })
    }
}

/// Use the caller's seed, else the current unix time in milliseconds folded
/// into 32 bits.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        (millis % (1u128 << 32)) as u64
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GenerationParams {
        GenerationParams {
            prompt: "a lighthouse in a storm".to_string(),
            negative: "text, watermark".to_string(),
            width: 896,
            height: 1152,
            steps: 28,
            cfg: 6.0,
            seed: Some(1234),
        }
    }

    #[test]
    fn builds_fixed_seven_node_topology() {
        let wf = WorkflowBuilder::sdxl().unwrap().build(&params()).unwrap();
        let g = &wf.graph;

        let nodes = g.as_object().unwrap();
        assert_eq!(nodes.len(), 7);
        let classes: Vec<&str> = ["1", "2", "3", "4", "5", "6", "7"]
            .iter()
            .map(|id| g[*id]["class_type"].as_str().unwrap())
            .collect();
        assert_eq!(
            classes,
            [
                "CheckpointLoaderSimple",
                "CLIPTextEncode",
                "CLIPTextEncode",
                "EmptyLatentImage",
                "KSampler",
                "VAEDecode",
                "SaveImage"
            ]
        );

        assert_eq!(g["1"]["inputs"]["ckpt_name"], "sd_xl_base_1.0.safetensors");
        assert_eq!(g["2"]["inputs"]["text"], "a lighthouse in a storm");
        assert_eq!(g["2"]["inputs"]["clip"], json!(["1", 1]));
        assert_eq!(g["3"]["inputs"]["text"], "text, watermark");
        assert_eq!(g["4"]["inputs"], json!({"width": 896, "height": 1152, "batch_size": 1}));
        assert_eq!(
            g["5"]["inputs"],
            json!({
                "model": ["1", 0],
                "positive": ["2", 0],
                "negative": ["3", 0],
                "latent_image": ["4", 0],
                "seed": 1234,
                "steps": 28,
                "cfg": 6.0,
                "sampler_name": "euler",
                "scheduler": "normal",
                "denoise": 1
            })
        );
        assert_eq!(g["6"]["inputs"], json!({"samples": ["5", 0], "vae": ["1", 2]}));
        assert_eq!(g["7"]["inputs"], json!({"images": ["6", 0], "filename_prefix": "webui"}));
        assert_eq!(wf.seed, 1234);
    }

    #[test]
    fn checkpoint_and_prefix_are_configurable() {
        let wf = WorkflowBuilder::sdxl()
            .unwrap()
            .checkpoint("juggernautXL.safetensors")
            .filename_prefix("gallery")
            .build(&params())
            .unwrap();
        assert_eq!(wf.graph["1"]["inputs"]["ckpt_name"], "juggernautXL.safetensors");
        assert_eq!(wf.graph["7"]["inputs"]["filename_prefix"], "gallery");
    }

    #[test]
    fn generated_seed_fits_in_32_bits() {
        let wf = WorkflowBuilder::sdxl()
            .unwrap()
            .build(&GenerationParams { seed: None, ..params() })
            .unwrap();
        assert!(wf.seed < (1u64 << 32));
        assert_eq!(wf.graph["5"]["inputs"]["seed"], json!(wf.seed));
    }

    #[test]
    fn invalid_params_never_reach_the_template() {
        let err = WorkflowBuilder::sdxl()
            .unwrap()
            .build(&GenerationParams { height: 0, ..params() })
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn loads_wrapped_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let body = json!({"prompt": serde_json::from_str::<Value>(SDXL_TEMPLATE).unwrap()});
        tokio::fs::write(&path, body.to_string()).await.unwrap();

        let wf = WorkflowBuilder::from_file(&path).await.unwrap().build(&params()).unwrap();
        assert_eq!(wf.graph["5"]["inputs"]["steps"], json!(28));
    }

    #[tokio::test]
    async fn missing_template_file_is_reported() {
        let err = WorkflowBuilder::from_file(Path::new("/nonexistent/template.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read workflow template"));
    }
}
