pub mod client;
pub mod history;

pub use client::{ComfyUIClient, QueueResponse};
pub use history::{job_status, JobStatus};
