//! Interpretation of ComfyUI `/history/{prompt_id}` responses.
//!
//! ComfyUI answers `{}` until a prompt has finished, then
//! `{"<id>": {"outputs": {"<node>": {"images": [{"filename": ..}]}}, ..}}`.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Complete { filename: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub filename: String,
}

/// Decide whether `prompt_id` has produced an image yet.
///
/// Node outputs are scanned in ascending node-id order (numeric ids compare
/// numerically) and the first non-empty `images` list wins.
pub fn job_status(history: &Value, prompt_id: &str) -> AppResult<JobStatus> {
    let Some(entry) = history.get(prompt_id) else {
        return Ok(JobStatus::Processing);
    };
    let Some(outputs) = entry.get("outputs").and_then(Value::as_object) else {
        return Ok(JobStatus::Processing);
    };

    let mut nodes: Vec<(&String, &Value)> = outputs.iter().collect();
    nodes.sort_by(|(a, _), (b, _)| node_order(a).cmp(&node_order(b)));

    for (node_id, output) in nodes {
        let Some(first) = output.get("images").and_then(Value::as_array).and_then(|a| a.first()) else {
            continue;
        };
        let image: ImageRef = serde_json::from_value(first.clone()).map_err(|e| {
            AppError::ComfyUI(format!("Malformed image record on node {}: {}", node_id, e))
        })?;
        tracing::debug!(prompt_id, node_id = %node_id, filename = %image.filename, "job complete");
        return Ok(JobStatus::Complete { filename: image.filename });
    }
    Ok(JobStatus::Processing)
}

fn node_order(id: &str) -> (u64, &str) {
    (id.parse::<u64>().unwrap_or(u64::MAX), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "6f1c2a7e-93a4-4f5b-8d0e-1b2c3d4e5f60";

    #[test]
    fn unknown_prompt_is_processing() {
        assert_eq!(job_status(&json!({}), ID).unwrap(), JobStatus::Processing);
    }

    #[test]
    fn entry_without_images_is_processing() {
        let history = json!({ ID: {"outputs": {"7": {"images": []}, "9": {"text": ["hi"]}}} });
        assert_eq!(job_status(&history, ID).unwrap(), JobStatus::Processing);
    }

    #[test]
    fn first_image_of_first_output_node_wins() {
        let history = json!({ ID: {
            "outputs": {
                "12": {"images": [{"filename": "late_00001_.png", "subfolder": "", "type": "output"}]},
                "7": {"images": [
                    {"filename": "webui_00042_.png", "subfolder": "", "type": "output"},
                    {"filename": "webui_00043_.png", "subfolder": "", "type": "output"}
                ]}
            },
            "status": {"completed": true}
        }});
        assert_eq!(
            job_status(&history, ID).unwrap(),
            JobStatus::Complete { filename: "webui_00042_.png".to_string() }
        );
    }

    #[test]
    fn malformed_image_record_is_an_error() {
        let history = json!({ ID: {"outputs": {"7": {"images": [{"subfolder": ""}]}}} });
        assert!(matches!(job_status(&history, ID), Err(AppError::ComfyUI(_))));
    }

    #[test]
    fn status_serializes_with_tag() {
        assert_eq!(serde_json::to_value(JobStatus::Processing).unwrap(), json!({"status": "processing"}));
        assert_eq!(
            serde_json::to_value(JobStatus::Complete { filename: "a.png".into() }).unwrap(),
            json!({"status": "complete", "filename": "a.png"})
        );
    }
}
