//! Mock OpenRouter upstream and request helpers shared by the integration tests
//!
//! Tests queue responses before each request; the mock pops and serves them
//! and records every request it receives for inspection.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use http_body_util::BodyExt;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

use openrouter_chat::{build_router, AppConfig, AppState};

pub const TEST_API_KEY: &str = "sk-or-test-key";
pub const TEST_SITE_URL: &str = "https://chat.example.test";
pub const TEST_SITE_NAME: &str = "Example Chat";

/// A response the mock serves for the next completion request
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    /// Held before the response is written
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Standard completion response carrying `content`
    pub fn text(content: &str) -> Self {
        let body = serde_json::json!({
            "id": "gen-mock",
            "model": "mock-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        Self {
            status: 200,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }
}

/// A request received by the mock upstream
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `(role, content)` pairs of the forwarded conversation
    pub fn messages(&self) -> Vec<(String, String)> {
        self.body["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| {
                        (
                            m["role"].as_str().unwrap_or_default().to_string(),
                            m["content"].as_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct UpstreamState {
    pub response_queue: VecDeque<MockResponse>,
    pub received_requests: Vec<ReceivedRequest>,
}

pub type SharedUpstreamState = Arc<Mutex<UpstreamState>>;

async fn handle_chat_completions(
    State(state): State<SharedUpstreamState>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, 10 * 1024 * 1024)
        .await
        .unwrap_or_default();
    let body_json: serde_json::Value =
        serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    let mock = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(ReceivedRequest {
            headers: parts.headers,
            body: body_json,
        });
        state
            .response_queue
            .pop_front()
            .unwrap_or_else(|| MockResponse::text("Default response (no mock queued)"))
    };

    if let Some(delay) = mock.delay {
        tokio::time::sleep(delay).await;
    }

    Response::builder()
        .status(mock.status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(mock.body))
        .unwrap()
}

async fn handle_models() -> (StatusCode, &'static str) {
    (StatusCode::OK, r#"{"data":[{"id":"mock-model"}]}"#)
}

/// Mock upstream bound to an ephemeral port
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub state: SharedUpstreamState,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state: SharedUpstreamState = Arc::new(Mutex::new(UpstreamState::default()));

        let app = Router::new()
            .route("/api/v1/chat/completions", post(handle_chat_completions))
            .route("/api/v1/models", get(handle_models))
            .with_state(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind mock upstream");
        let addr = listener.local_addr().expect("Mock upstream has no address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock upstream server failed");
        });

        Self { addr, state }
    }

    pub fn completions_url(&self) -> String {
        format!("http://{}/api/v1/chat/completions", self.addr)
    }

    pub fn queue(&self, response: MockResponse) {
        self.state.lock().unwrap().response_queue.push_back(response);
    }

    pub fn drain_requests(&self) -> Vec<ReceivedRequest> {
        self.state.lock().unwrap().received_requests.drain(..).collect()
    }
}

/// Config pointing at the mock with every site attribution value set
pub fn test_config(upstream: &MockUpstream) -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream.url = upstream.completions_url();
    config.upstream.timeout_seconds = 5;
    config.upstream.api_key = Some(TEST_API_KEY.to_string());
    config.upstream.site_url = Some(TEST_SITE_URL.to_string());
    config.upstream.site_name = Some(TEST_SITE_NAME.to_string());
    config
}

/// A browser-like client that keeps the session cookie between requests
pub struct TestClient {
    app: Router,
    cookie_name: String,
    pub session_id: Option<String>,
}

/// Response as seen by the test client
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("Response is not JSON ({}): {}", e, self.body))
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestClient {
    pub fn new(config: AppConfig) -> Self {
        let cookie_name = config.session.cookie_name.clone();
        let state = AppState::from_config(config).expect("Test config should be valid");
        Self {
            app: build_router(state),
            cookie_name,
            session_id: None,
        }
    }

    /// A second browser sharing the same server
    pub fn fork(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookie_name: self.cookie_name.clone(),
            session_id: None,
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path, None, Body::empty());
        self.send(request).await
    }

    pub async fn post_json(&mut self, path: &str, body: &str) -> TestResponse {
        let request = self.request("POST", path, Some("application/json"), Body::from(body.to_string()));
        self.send(request).await
    }

    pub async fn post_form(&mut self, path: &str, body: &str) -> TestResponse {
        let request = self.request(
            "POST",
            path,
            Some("application/x-www-form-urlencoded"),
            Body::from(body.to_string()),
        );
        self.send(request).await
    }

    pub async fn chat(&mut self, message: &str) -> TestResponse {
        let body = serde_json::json!({ "message": message }).to_string();
        self.post_json("/chat", &body).await
    }

    pub async fn set_model(&mut self, key: &str) -> TestResponse {
        self.post_form("/set_model", &format!("model={}", key)).await
    }

    fn request(&self, method: &str, path: &str, content_type: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(ref id) = self.session_id {
            builder = builder.header(header::COOKIE, format!("{}={}", self.cookie_name, id));
        }
        builder.body(body).unwrap()
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let prefix = format!("{}=", self.cookie_name);
        if let Some(id) = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .and_then(|pair| pair.strip_prefix(prefix.as_str()))
        {
            self.session_id = Some(id.to_string());
        }

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
