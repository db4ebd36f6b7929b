//! Prompt templating with simple `{{placeholder}}` substitution.
//!
//! Given a JSON `template` and an `inputs` object, recursively walks the
//! template and replaces any string values of the form `{{ key }}` with
//! `inputs[key]`, returning a constructed JSON value. Replacements keep their
//! JSON type, so `"{{width}}"` becomes the number `1024`, not a string.
use serde_json::Value;
use crate::error::{AppResult, AppError};

#[derive(Debug, Default, Clone, Copy)]
pub struct PromptConstructor;

impl PromptConstructor {
    pub fn new() -> Self {
        PromptConstructor
    }

    /// Construct a prompt by substituting placeholders inside `template`
    /// with corresponding values from `inputs`.
    pub fn construct_prompt(&self, template: &Value, inputs: &Value) -> AppResult<Value> {
        self.validate_template(template)?;
        self.validate_inputs(inputs)?;

        let mut constructed = template.clone();
        self.replace_placeholders(&mut constructed, inputs)?;

        Ok(constructed)
    }

    /// A template is a non-empty map of node id to `{class_type, inputs}`.
    pub fn validate_template(&self, template: &Value) -> AppResult<()> {
        let nodes = template.as_object().ok_or_else(|| {
            AppError::PromptConstruction("Template must be a JSON object of nodes".to_string())
        })?;
        if nodes.is_empty() {
            return Err(AppError::PromptConstruction("Template has no nodes".to_string()));
        }
        for (id, node) in nodes {
            if node.get("class_type").and_then(Value::as_str).is_none() {
                return Err(AppError::PromptConstruction(format!(
                    "Node '{}' is missing a string class_type",
                    id
                )));
            }
            if !node.get("inputs").map(Value::is_object).unwrap_or(false) {
                return Err(AppError::PromptConstruction(format!(
                    "Node '{}' is missing an inputs object",
                    id
                )));
            }
        }
        Ok(())
    }

    fn validate_inputs(&self, inputs: &Value) -> AppResult<()> {
        if inputs.is_object() {
            Ok(())
        } else {
            Err(AppError::PromptConstruction("Inputs must be a JSON object".to_string()))
        }
    }

    /// Recursively replace `{{key}}` strings with `inputs[key]`.
    fn replace_placeholders(&self, value: &mut Value, inputs: &Value) -> AppResult<()> {
        match value {
            Value::Object(map) => {
                for (_, v) in map.iter_mut() {
                    self.replace_placeholders(v, inputs)?;
                }
            }
            Value::Array(arr) => {
                for v in arr.iter_mut() {
                    self.replace_placeholders(v, inputs)?;
                }
            }
            Value::String(s) => {
                if let Some(key) = placeholder_key(s) {
                    match inputs.get(key) {
                        Some(replacement) => *value = replacement.clone(),
                        None => {
                            return Err(AppError::PromptConstruction(format!(
                                "Missing input for placeholder: {}",
                                key
                            )))
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn placeholder_key(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?.trim();
    (!inner.is_empty()).then_some(inner)
}
