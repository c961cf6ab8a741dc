mod helpers;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use helpers::*;
use oxidesk_routing::infrastructure::http::router::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &'static str,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        request = request.header(header::CONTENT_TYPE, content_type);
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    ctx.teardown().await;
}

#[tokio::test]
async fn test_routing_next_over_http() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/departments",
        Some(json!({ "id": "sales", "name": "Sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/routing/next",
        Some(json!({ "department_id": "sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "no_agent_available" }));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/agents",
        Some(json!({
            "id": "a",
            "username": "alice",
            "capabilities": ["livechat-agent"],
            "status": "online"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/departments/sales/agents/a",
        Some(json!({ "order": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/routing/next",
        Some(json!({ "department_id": "sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "agent_id": "a", "username": "alice" }));

    // No body at all means global rotation
    let (status, body) = send(&app, Method::POST, "/api/routing/next", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "a");

    ctx.teardown().await;
}

#[tokio::test]
async fn test_invalid_window_returns_reason() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());
    create_department(&ctx.state, "sales").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/business-hours",
        Some(json!({
            "department_id": "sales",
            "day": "Monday",
            "start": "18:00",
            "end": "09:00",
            "timezone": "UTC"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "start_not_before_end");

    ctx.teardown().await;
}

#[tokio::test]
async fn test_department_open_endpoint() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());
    create_department(&ctx.state, "sales").await;
    save_window(&ctx.state, Some("sales"), "Monday", "09:00", "17:00", "UTC").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/departments/sales/open?at=2024-01-01T12:00:00Z",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["open"], true);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/departments/sales/open?at=2024-01-02T12:00:00Z",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["open"], false);

    // Defaults to the service clock (Monday 10:00)
    let (status, body) = send(&app, Method::GET, "/api/departments/sales/open", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["open"], true);

    let (status, _) = send(&app, Method::GET, "/api/departments/ghost/open", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/departments/sales/open?at=yesterday",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.teardown().await;
}

#[tokio::test]
async fn test_refresh_endpoint_reports_counts() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());
    create_agent(&ctx.state, "a", "alice").await;
    save_window(&ctx.state, None, "Friday", "09:00", "17:00", "UTC").await;

    let (status, body) = send(&app, Method::POST, "/api/availability/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "evaluated": 1, "updated": 1 }));

    ctx.teardown().await;
}

#[tokio::test]
async fn test_malformed_routing_body_is_rejected() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());
    create_department(&ctx.state, "sales").await;
    // Outside every department, so only the global rotation could reach them
    create_agent(&ctx.state, "z", "outsider").await;

    let (status, body) = send_raw(
        &app,
        Method::POST,
        "/api/routing/next",
        Some("application/json"),
        r#"{"department_id":"sales"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "no_agent_available" }));

    let malformed = [
        (None, r#"{"department_id":"sales"}"#),
        (Some("text/plain"), r#"{"department_id":"sales"}"#),
        (Some("application/json"), r#"{"department_id":5}"#),
        (Some("application/json"), r#"{"department_id":"sales""#),
    ];
    for uri in ["/api/routing/next", "/api/routing/next-bot"] {
        for (content_type, payload) in malformed {
            let (status, body) = send_raw(&app, Method::POST, uri, content_type, payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {:?} {}", uri, content_type, payload);
            assert!(body["error"].is_string());
        }
    }

    let agent = ctx.state.agent_directory_service.get_agent("z").await.unwrap();
    assert_eq!(agent.routing_count, 0);

    ctx.teardown().await;
}

#[tokio::test]
async fn test_malformed_membership_body_is_rejected() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());
    create_department(&ctx.state, "sales").await;
    create_agent(&ctx.state, "a", "alice").await;

    let (status, _) = send_raw(
        &app,
        Method::PUT,
        "/api/departments/sales/agents/a",
        Some("application/json"),
        r#"{"order":"first"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ctx
        .state
        .membership_service
        .list_by_department("sales")
        .await
        .unwrap()
        .is_empty());

    // Empty body adds with the default order
    let (status, body) = send_raw(
        &app,
        Method::PUT,
        "/api/departments/sales/agents/a",
        None,
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], 0);

    ctx.teardown().await;
}

#[tokio::test]
async fn test_agent_status_endpoints() {
    let ctx = setup_routing(custom_settings()).await;
    let app = build_router(ctx.state.clone());
    create_department(&ctx.state, "sales").await;
    save_window(&ctx.state, Some("sales"), "Monday", "09:00", "17:00", "UTC").await;
    create_agent(&ctx.state, "a", "alice").await;
    create_agent(&ctx.state, "b", "bob").await;
    add_member(&ctx.state, "sales", "a", 0).await;
    // b has no department and falls back to a closed global window
    save_window(&ctx.state, None, "Tuesday", "09:00", "17:00", "UTC").await;
    ctx.state
        .business_hour_evaluator
        .refresh_agent_availability()
        .await
        .unwrap();

    let (status, body) = send(&app, Method::GET, "/api/agents/status-summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "available": 1, "away": 0, "busy": 0, "offline": 1 })
    );

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/agents/status-summary?department_id=sales",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "available": 1, "away": 0, "busy": 0, "offline": 0 })
    );

    let (status, body) = send(&app, Method::GET, "/api/agents/a/business-hours", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "agent_id": "a", "within_business_hours": true }));

    let (status, body) = send(&app, Method::GET, "/api/agents/b/business-hours", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["within_business_hours"], false);

    let (status, _) = send(&app, Method::GET, "/api/agents/ghost/business-hours", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.teardown().await;
}
