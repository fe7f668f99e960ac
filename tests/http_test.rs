//! End-to-end tests through the axum stack.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use switchyard::{Application, MemorySessionStore, PlainRenderer};

mod common;

use common::{
    app, app_with, config, http_form, http_get, registry, send, view_vars, PASSWORD,
};

#[tokio::test]
async fn test_first_visit_sets_session_cookie_and_request_id() {
    let router = app().server().router();

    let reply = send(&router, http_get("/login", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.session_cookie().is_some());
    assert!(reply.headers.contains_key("x-request-id"));
    assert_eq!(
        reply.headers[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
}

#[tokio::test]
async fn test_known_session_is_not_reissued() {
    let router = app().server().router();

    let first = send(&router, http_get("/login", None)).await;
    let sid = first.session_cookie().unwrap();

    let second = send(&router, http_get("/posts", Some(&sid))).await;
    assert_eq!(second.body, "posts#index");
    assert!(second.session_cookie().is_none());
}

#[tokio::test]
async fn test_login_over_http_rotates_session() {
    let router = app().server().router();

    let page = send(&router, http_get("/admin", None)).await;
    let sid = page.session_cookie().unwrap();
    let token = view_vars(&page.body)["csrf_token"]
        .as_str()
        .unwrap()
        .to_string();

    let login = send(
        &router,
        http_form(
            "POST",
            "/login",
            Some(&sid),
            &[("csrf_token", token.as_str()), ("password", PASSWORD)],
        ),
    )
    .await;
    assert_eq!(login.status, StatusCode::FOUND);
    assert_eq!(login.headers[header::LOCATION], "http://localhost/admin");
    let rotated = login.session_cookie().unwrap();
    assert_ne!(rotated, sid);

    let stale = send(&router, http_get("/admin", Some(&sid))).await;
    assert!(stale.body.starts_with("account/login"));

    let admin = send(&router, http_get("/admin", Some(&rotated))).await;
    assert_eq!(admin.status, StatusCode::OK);
    assert!(admin.body.starts_with("admin/index"));
    assert_eq!(view_vars(&admin.body)["flash"]["success"], "Welcome back.");
}

#[tokio::test]
async fn test_method_override_field() {
    let router = app().server().router();

    let reply = send(
        &router,
        http_form("POST", "/posts/12", None, &[("_method", "DELETE")]),
    )
    .await;
    assert_eq!(reply.body, "posts#destroy 12");

    let reply = send(
        &router,
        http_form("POST", "/posts/12", None, &[("_method", "patch")]),
    )
    .await;
    assert_eq!(reply.body, "posts#update 12");
}

#[tokio::test]
async fn test_unroutable_requests_are_404() {
    let router = app().server().router();

    let reply = send(&router, http_get("/nope", None)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "Page not found.");

    let put = axum::http::Request::builder()
        .method("PUT")
        .uri("/posts/1")
        .body(Body::empty())
        .unwrap();
    let reply = send(&router, put).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_handler_failure_is_500() {
    let router = app().server().router();

    let reply = send(&router, http_get("/broken", None)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "Internal Server Error");
}

#[tokio::test]
async fn test_mount_prefix_is_stripped() {
    let mut config = config();
    config.base_url = "/app".into();
    let router = app_with(config).server().router();

    let reply = send(&router, http_get("/app/posts/4", None)).await;
    assert_eq!(reply.body, "posts#show 4");

    let page = send(&router, http_get("/app/login", None)).await;
    assert_eq!(view_vars(&page.body)["base_url"], "/app");
}

#[tokio::test]
async fn test_redirect_uses_host_header() {
    let router = app().server().router();

    let reply = send(&router, http_get("/login", None)).await;
    let sid = reply.session_cookie().unwrap();

    let logout = axum::http::Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::HOST, "blog.example")
        .header("x-forwarded-proto", "https")
        .header(header::COOKIE, format!("SID={}", sid))
        .body(Body::empty())
        .unwrap();
    let reply = send(&router, logout).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers[header::LOCATION], "https://blog.example/login");
}

#[tokio::test]
async fn test_anonymous_requests_leave_no_sessions_behind() {
    let store = MemorySessionStore::new();
    let app = Application::build_with(
        config(),
        registry(),
        Arc::new(PlainRenderer),
        Arc::new(store.clone()),
    )
    .unwrap();
    let router = app.server().router();

    for _ in 0..25 {
        let reply = send(&router, http_get("/nowhere", None)).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.session_cookie().is_none());

        let reply = send(&router, http_get("/posts", None)).await;
        assert_eq!(reply.body, "posts#index");
        assert!(reply.session_cookie().is_none());
    }
    assert_eq!(store.count(), 0);

    let reply = send(&router, http_get("/login", None)).await;
    assert!(reply.session_cookie().is_some());
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = config();
    config.security.max_body_size = 16;
    let router = app_with(config).server().router();

    let reply = send(
        &router,
        http_form("POST", "/posts/12", None, &[("_method", "DELETE"), ("pad", "x".repeat(64).as_str())]),
    )
    .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);

    let reply = send(
        &router,
        http_form("POST", "/posts/12", None, &[("_method", "DELETE")]),
    )
    .await;
    assert_eq!(reply.body, "posts#destroy 12");
}
