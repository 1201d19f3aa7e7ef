//! Local stand-in for the Gemini endpoint that records what it receives.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tokio::sync::Mutex;

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

struct Reply {
    status: StatusCode,
    body: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

pub struct FakeGemini {
    pub base_url: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl FakeGemini {
    pub async fn spawn_ok(text: &str) -> Self {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {
                "promptTokenCount": 12,
                "candidatesTokenCount": 4,
                "totalTokenCount": 16
            }
        });
        Self::spawn(StatusCode::OK, &body.to_string()).await
    }

    pub async fn spawn(status: StatusCode, body: &str) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let reply = Arc::new(Reply {
            status,
            body: body.to_string(),
            received: received.clone(),
        });

        let router = Router::new().fallback(handle).with_state(reply);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake Gemini listener");
        let addr = listener
            .local_addr()
            .expect("fake Gemini listener has no address");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("fake Gemini server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            received,
        }
    }

    pub async fn requests(&self) -> Vec<ReceivedRequest> {
        self.received.lock().await.clone()
    }
}

async fn handle(
    State(reply): State<Arc<Reply>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    reply.received.lock().await.push(ReceivedRequest {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    (
        reply.status,
        [("content-type", "application/json")],
        reply.body.clone(),
    )
        .into_response()
}
