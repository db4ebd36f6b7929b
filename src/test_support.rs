//! In-process stand-in for a ComfyUI server, used by unit tests.
use std::net::TcpListener;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct StubComfy {
    inner: Arc<RwLock<StubState>>,
}

#[derive(Default)]
struct StubState {
    reject_prompts: bool,
    omit_prompt_id: bool,
    garbage_replies: bool,
    last_prompt: Option<Value>,
    finished_with: Option<String>,
}

impl StubComfy {
    pub const PROMPT_ID: &'static str = "6f1c2a7e-93a4-4f5b-8d0e-1b2c3d4e5f60";

    pub fn rejecting_prompts(self) -> Self {
        self.set(|s| s.reject_prompts = true)
    }

    pub fn without_prompt_id(self) -> Self {
        self.set(|s| s.omit_prompt_id = true)
    }

    pub fn garbage_replies(self) -> Self {
        self.set(|s| s.garbage_replies = true)
    }

    fn set(self, f: impl FnOnce(&mut StubState)) -> Self {
        // Only called before the stub is shared with a server task.
        if let Ok(mut state) = self.inner.try_write() {
            f(&mut state);
        }
        self
    }

    pub async fn last_prompt(&self) -> Option<Value> {
        self.inner.read().await.last_prompt.clone()
    }

    pub async fn finish_with(&self, filename: &str) {
        self.inner.write().await.finished_with = Some(filename.to_string());
    }

    fn router(self) -> Router {
        Router::new()
            .route("/prompt", post(queue))
            .route("/history/:prompt_id", get(history))
            .route("/system_stats", get(|| async { Json(json!({"system": {"os": "posix"}})) }))
            .route("/view", get(|| async { vec![0x89u8, b'P', b'N', b'G'] }))
            .with_state(self)
    }
}

async fn queue(State(stub): State<StubComfy>, Json(body): Json<Value>) -> Response {
    let mut state = stub.inner.write().await;
    state.last_prompt = Some(body);
    if state.garbage_replies {
        return (StatusCode::OK, "<html>proxy error</html>").into_response();
    }
    if state.reject_prompts {
        let err = json!({"error": {"type": "prompt_outputs_failed_validation"}, "node_errors": {}});
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    }
    if state.omit_prompt_id {
        return Json(json!({"number": 3, "node_errors": {}})).into_response();
    }
    Json(json!({"prompt_id": StubComfy::PROMPT_ID, "number": 3, "node_errors": {}})).into_response()
}

async fn history(State(stub): State<StubComfy>, Path(prompt_id): Path<String>) -> Response {
    let state = stub.inner.read().await;
    if state.garbage_replies {
        return (StatusCode::OK, "<html>proxy error</html>").into_response();
    }
    let body = match &state.finished_with {
        Some(filename) if prompt_id == StubComfy::PROMPT_ID => Json(json!({
            prompt_id: {
                "outputs": {"7": {"images": [{"filename": filename, "subfolder": "", "type": "output"}]}},
                "status": {"status_str": "success", "completed": true}
            }
        })),
        _ => Json(json!({})),
    };
    body.into_response()
}

/// Serve `stub` on an ephemeral port and return its base URL.
pub async fn spawn_stub(stub: StubComfy) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    let server = axum::Server::from_tcp(listener)
        .expect("stub server")
        .serve(stub.router().into_make_service());
    tokio::spawn(async move {
        let _ = server.await;
    });
    format!("http://{}", addr)
}

/// A local URL nothing is listening on.
pub fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{}", addr)
}
