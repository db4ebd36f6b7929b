//! User-facing generation parameters.
//!
//! Browsers tend to post form values as strings, so the numeric fields accept
//! either JSON numbers or numeric strings.
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PROMPT: &str = "a beautiful landscape";
pub const DEFAULT_NEGATIVE: &str = "blurry, low quality, distorted";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub prompt: String,
    pub negative: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub width: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub height: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub steps: u32,
    #[serde(deserialize_with = "lenient_f64")]
    pub cfg: f64,
    #[serde(deserialize_with = "lenient_seed", skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            prompt: DEFAULT_PROMPT.to_string(),
            negative: DEFAULT_NEGATIVE.to_string(),
            width: 1024,
            height: 1024,
            steps: 20,
            cfg: 7.5,
            seed: None,
        }
    }
}

impl GenerationParams {
    pub fn from_json(payload: Value) -> AppResult<Self> {
        serde_json::from_value(payload).map_err(|e| AppError::BadRequest(e.to_string()))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::BadRequest("width and height must be greater than zero".to_string()));
        }
        if self.steps == 0 {
            return Err(AppError::BadRequest("steps must be greater than zero".to_string()));
        }
        if !self.cfg.is_finite() {
            return Err(AppError::BadRequest("cfg must be a finite number".to_string()));
        }
        Ok(())
    }
}

fn value_to_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    value_to_u64(&v)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {}", v)))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    let parsed = match &v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| de::Error::custom(format!("expected a number, got {}", v)))
}

fn lenient_seed<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match &v {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        _ => value_to_u64(&v)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer seed, got {}", v))),
    }
}
