//! End-to-end tests for execution dispatch and peer notification.
//!
//! Backends and reporters are real HTTP listeners on loopback ports.

use axum::Router;
use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;

use common::{StubPeer, create_session, empty_request, json_request, send, send_json, session_log, test_app};

async fn register_backend(app: &Router, kind: &str, name: &str, capability: &str, peer: &StubPeer) {
    let (status, _) = send(
        app,
        json_request(
            Method::POST,
            &format!("/{kind}/"),
            json!({"name": name, "type": capability, "callback": peer.base_url}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn register_reporter(app: &Router, name: &str, live: bool, peer: &StubPeer) {
    let (status, _) = send(
        app,
        json_request(
            Method::POST,
            "/reporter/",
            json!({"name": name, "callback": peer.base_url, "live": live}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn pair(category: &str, message: &str) -> (String, String) {
    (category.to_string(), message.to_string())
}

// ============================================================================
// Execution
// ============================================================================

#[tokio::test]
async fn test_execute_success_logs_two_entries() {
    let peer = StubPeer::spawn(r#"{"success":true,"message":""}"#).await;
    let app = test_app();
    register_backend(&app, "actor", "pinger", "t1", &peer).await;
    let id = create_session(&app).await;

    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/actor/execute",
            json!({"type": "t1", "action": "ping", "session": id, "parameters": {"n": 1}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": ""}));

    let forwarded = peer
        .wait_for(Method::POST, "/actor/pinger/execute")
        .await
        .expect("backend received execute");
    assert_eq!(forwarded.body["action"], "ping");
    assert_eq!(forwarded.body["session"], id);
    assert_eq!(forwarded.body["parameters"]["n"], 1);

    assert_eq!(
        session_log(&app, &id).await,
        vec![
            pair("system::actor::pinger", "Executing action 'ping'."),
            pair("system::actor::pinger", "Actor action: SUCCESS"),
        ]
    );
}

#[tokio::test]
async fn test_execute_failure_logs_backend_message() {
    let peer = StubPeer::spawn(r#"{"success":false,"message":"element missing"}"#).await;
    let app = test_app();
    register_backend(&app, "driver", "web", "browser", &peer).await;
    let id = create_session(&app).await;

    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/driver/execute",
            json!({"type": "browser", "action": "click", "session": id}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        session_log(&app, &id).await,
        vec![
            pair("system::driver::web", "Executing action 'click'."),
            pair("system::driver::web", "Driver action: FAILED"),
            pair("message::driver::web", "element missing"),
        ]
    );
}

#[tokio::test]
async fn test_execute_garbage_reply_is_failed_dependency() {
    let peer = StubPeer::spawn("<html>oops</html>").await;
    let app = test_app();
    register_backend(&app, "driver", "web", "browser", &peer).await;
    let id = create_session(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/driver/execute",
            json!({"type": "browser", "action": "click", "session": id}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FAILED_DEPENDENCY);
    let log = session_log(&app, &id).await;
    assert_eq!(log, vec![pair("system::driver::web", "Executing action 'click'.")]);
}

#[tokio::test]
async fn test_execute_unreachable_backend_is_internal_error() {
    let app = test_app();
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/actor/",
            json!({"name": "gone", "type": "t1", "callback": "http://127.0.0.1:9/"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = create_session(&app).await;

    let (status, json) = send_json(
        &app,
        json_request(
            Method::POST,
            "/actor/execute",
            json!({"type": "t1", "action": "ping", "session": id}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], 500);
}

#[tokio::test]
async fn test_most_recent_registration_wins() {
    let old = StubPeer::spawn(r#"{"success":true,"message":"old"}"#).await;
    let new = StubPeer::spawn(r#"{"success":true,"message":"new"}"#).await;
    let app = test_app();
    register_backend(&app, "actor", "first", "t1", &old).await;
    register_backend(&app, "actor", "second", "t1", &new).await;
    let id = create_session(&app).await;

    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/actor/execute",
            json!({"type": "t1", "action": "ping", "session": id}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "new");
    assert!(old.requests().is_empty());
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_session_end_notifies_backends() {
    let peer = StubPeer::spawn("{}").await;
    let app = test_app();
    register_backend(&app, "driver", "web", "browser", &peer).await;
    register_backend(&app, "actor", "shell", "sh", &peer).await;
    let id = create_session(&app).await;

    let (status, _) = send(&app, empty_request(Method::DELETE, &format!("/session/{id}"))).await;
    assert_eq!(status, StatusCode::OK);

    assert!(
        peer.wait_for(Method::DELETE, &format!("/driver/web/session/{id}"))
            .await
            .is_some()
    );
    assert!(
        peer.wait_for(Method::DELETE, &format!("/actor/shell/session/{id}"))
            .await
            .is_some()
    );
}

#[tokio::test]
async fn test_live_reporter_receives_entries_and_final_report() {
    let peer = StubPeer::spawn("{}").await;
    let app = test_app();
    register_reporter(&app, "JUnit", true, &peer).await;
    let id = create_session(&app).await;

    send(
        &app,
        json_request(
            Method::POST,
            &format!("/session/{id}"),
            json!({"type": "logMessage", "logMessage": "hello"}),
        ),
    )
    .await;

    let live = peer
        .wait_for(Method::POST, "/reporter/junit/live")
        .await
        .expect("live push delivered");
    assert_eq!(live.body["session"], id);
    assert_eq!(live.body["message"]["type"], "client");
    assert_eq!(live.body["message"]["message"], "hello");

    send(&app, empty_request(Method::DELETE, &format!("/session/{id}"))).await;

    let report = peer
        .wait_for(Method::POST, "/reporter/junit/report")
        .await
        .expect("final report delivered");
    assert_eq!(report.body["uuid"], id);
    assert_eq!(report.body["context"]["log"][0]["message"], "hello");
}

#[tokio::test]
async fn test_non_live_reporter_gets_only_final_report() {
    let peer = StubPeer::spawn("{}").await;
    let app = test_app();
    register_reporter(&app, "archive", false, &peer).await;
    let id = create_session(&app).await;

    send(
        &app,
        json_request(
            Method::POST,
            &format!("/session/{id}"),
            json!({"type": "logMessage", "logMessage": "quiet"}),
        ),
    )
    .await;
    send(&app, empty_request(Method::DELETE, &format!("/session/{id}"))).await;

    assert!(
        peer.wait_for(Method::POST, "/reporter/archive/report")
            .await
            .is_some()
    );
    let reports = peer
        .requests()
        .into_iter()
        .filter(|r| r.path.starts_with("/reporter/archive/"))
        .map(|r| r.path)
        .collect::<Vec<_>>();
    assert_eq!(reports, ["/reporter/archive/report"]);
}
