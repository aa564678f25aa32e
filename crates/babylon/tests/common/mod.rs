//! Common test utilities.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use babylon::background::BackgroundTasks;
use babylon::server::{self, AppState, HubServices, SelfManagement};
use babylon::transport::HttpTransport;

/// Address every test request appears to come from.
pub const PEER_IP: [u8; 4] = [10, 1, 2, 3];

// ============================================================================
// Hub
// ============================================================================

/// Create a test `AppState` backed by a real HTTP transport.
pub fn test_app_state(self_management: SelfManagement) -> AppState {
    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    AppState {
        services: HubServices::new(Arc::new(transport), BackgroundTasks::new()),
        self_management,
        max_connections: 64,
    }
}

/// Build the router for `state` with a fixed peer address.
pub fn app_for(state: AppState) -> Router {
    server::build_app(state, 300).layer(MockConnectInfo(SocketAddr::from((PEER_IP, 40000))))
}

/// Create a test app with empty state and self-management enabled.
pub fn test_app() -> Router {
    app_for(test_app_state(SelfManagement::all()))
}

/// Serve a hub with empty state on an ephemeral loopback port.
///
/// Returns the base URL, without a trailing slash.
pub async fn spawn_hub() -> String {
    let app = server::build_app(test_app_state(SelfManagement::all()), 300);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Create a session and return its id.
pub async fn create_session(app: &Router) -> String {
    let (status, json) = send_json(app, empty_request(Method::GET, "/session")).await;
    assert_eq!(status, StatusCode::CREATED);
    json["uuid"].as_str().unwrap().to_string()
}

/// Fetch a session log as `(type, message)` pairs.
pub async fn session_log(app: &Router, id: &str) -> Vec<(String, String)> {
    let (status, json) = send_json(app, empty_request(Method::GET, &format!("/session/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    json["context"]["log"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["type"].as_str().unwrap().to_string(),
                e["message"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

// ============================================================================
// Stub Peer
// ============================================================================

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

/// A backend/reporter stand-in listening on an ephemeral loopback port.
///
/// Every request is recorded. Paths ending in `/execute` answer with the
/// configured reply; everything else answers `200 {}`.
pub struct StubPeer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubPeer {
    pub async fn spawn(execute_reply: &str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let execute_reply = execute_reply.to_string();

        let router = Router::new().fallback(move |method: Method, uri: Uri, body: Bytes| {
            let recorded = recorded.clone();
            let execute_reply = execute_reply.clone();
            async move {
                let path = uri.path().to_string();
                let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
                recorded.lock().unwrap().push(Recorded {
                    method,
                    path: path.clone(),
                    body: json,
                });

                let reply = if path.ends_with("/execute") {
                    execute_reply
                } else {
                    "{}".to_string()
                };
                (StatusCode::OK, [("content-type", "application/json")], reply)
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until a request with `method` and `path` arrives.
    pub async fn wait_for(&self, method: Method, path: &str) -> Option<Recorded> {
        for _ in 0..200 {
            let found = self
                .requests()
                .into_iter()
                .find(|r| r.method == method && r.path == path);
            if found.is_some() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}
