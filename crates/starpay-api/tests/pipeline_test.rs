#![allow(clippy::unwrap_used)]
// Integration tests for `RequestPipeline` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use starpay_api::{
    Account, DataEnvelope, Error, MemoryStorage, PageResult, RequestPipeline, SessionStore,
    TransportConfig,
};

const ACCOUNTS: &str = "api/v1/starpay-alert/account";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<SessionStore>, RequestPipeline) {
    setup_with(TransportConfig::default()).await
}

async fn setup_with(transport: TransportConfig) -> (MockServer, Arc<SessionStore>, RequestPipeline) {
    let server = MockServer::start().await;
    let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
    let pipeline = RequestPipeline::new(
        Url::parse(&server.uri()).unwrap(),
        Arc::clone(&store),
        &transport,
    )
    .unwrap();
    (server, store, pipeline)
}

fn account_page() -> serde_json::Value {
    json!({
        "status": 200,
        "message": "ok",
        "data": [{ "id": "a1", "username": "alice", "role": "admin", "is_active": true }],
        "page": 1,
        "limit": 10,
        "total": 1
    })
}

fn no_auth_header(req: &Request) -> bool {
    !req.headers.contains_key("authorization")
}

// ── Header injection ────────────────────────────────────────────────

#[tokio::test]
async fn attaches_bearer_token_when_logged_in() {
    let (server, store, pipeline) = setup().await;
    store.login("tok-123", Some("admin".into()), None);

    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNTS}")))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("accept", "application/json"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_page()))
        .expect(1)
        .mount(&server)
        .await;

    let page: PageResult<Account> = pipeline
        .get_json(ACCOUNTS, &[("page", 1), ("limit", 10)])
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].username, "alice");
}

#[tokio::test]
async fn sends_unauthenticated_when_anonymous() {
    let (server, _store, pipeline) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNTS}")))
        .and(no_auth_header)
        .respond_with(ResponseTemplate::new(200).set_body_json(account_page()))
        .expect(1)
        .mount(&server)
        .await;

    let page: PageResult<Account> = pipeline
        .get_json(ACCOUNTS, &[("page", 1), ("limit", 10)])
        .await
        .unwrap();
    assert_eq!(page.page, 1);
}

#[tokio::test]
async fn header_follows_the_latest_session() {
    let (server, store, pipeline) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/{ACCOUNTS}/a1")))
        .and(header("authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store.login("first", None, None);
    store.logout();
    store.login("second", None, None);

    pipeline.delete(&format!("{ACCOUNTS}/a1")).await.unwrap();
}

// ── Status classification ───────────────────────────────────────────

#[tokio::test]
async fn unauthorized_logs_out_and_surfaces_error() {
    let (server, store, pipeline) = setup().await;
    store.login("expired", Some("admin".into()), Some("alice".into()));

    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNTS}")))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result: Result<PageResult<Account>, Error> =
        pipeline.get_json(ACCOUNTS, &[("page", 1)]).await;

    match result {
        Err(Error::Unauthorized { message }) => {
            assert_eq!(message.as_deref(), Some("token expired"));
        }
        other => panic!("expected Unauthorized, got: {other:?}"),
    }
    assert!(!store.is_authenticated());
    assert!(store.token().is_none());
    assert_eq!(store.role(), None);
}

#[tokio::test]
async fn client_error_keeps_session_and_message() {
    let (server, store, pipeline) = setup().await;
    store.login("tok", None, None);

    Mock::given(method("POST"))
        .and(path(format!("/{ACCOUNTS}")))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Username already taken" })),
        )
        .mount(&server)
        .await;

    let result: Result<Option<DataEnvelope<Account>>, Error> = pipeline
        .post_json(ACCOUNTS, &json!({ "username": "alice" }))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Client { status: 409, .. }), "got: {err:?}");
    assert_eq!(err.user_message(), "Username already taken");
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let (server, store, pipeline) = setup().await;
    store.login("tok", None, None);

    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNTS}")))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let result: Result<PageResult<Account>, Error> =
        pipeline.get_json(ACCOUNTS, &[("page", 1)]).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Server { status: 503, message: None }), "got: {err:?}");
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn malformed_success_body_is_a_deserialization_error() {
    let (server, _store, pipeline) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNTS}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result: Result<PageResult<Account>, Error> =
        pipeline.get_json(ACCOUNTS, &[("page", 1)]).await;

    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}

// ── Transport failures ──────────────────────────────────────────────

#[tokio::test]
async fn slow_response_times_out() {
    let (server, store, pipeline) = setup_with(TransportConfig {
        timeout: Duration::from_millis(100),
    })
    .await;
    store.login("tok", None, None);

    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNTS}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(account_page())
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let result: Result<PageResult<Account>, Error> =
        pipeline.get_json(ACCOUNTS, &[("page", 1)]).await;

    let err = result.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
    let pipeline = RequestPipeline::new(
        Url::parse("http://127.0.0.1:1").unwrap(),
        store,
        &TransportConfig::default(),
    )
    .unwrap();

    let result: Result<PageResult<Account>, Error> =
        pipeline.get_json(ACCOUNTS, &[("page", 1)]).await;

    assert!(
        matches!(result, Err(Error::Network { timed_out: false, .. })),
        "got: {result:?}"
    );
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn no_content_reply_is_none() {
    let (server, _store, pipeline) = setup().await;

    Mock::given(method("PUT"))
        .and(path(format!("/{ACCOUNTS}/a1")))
        .and(body_json(json!({ "username": "alice", "role": "viewer", "is_active": false })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let out: Option<DataEnvelope<Account>> = pipeline
        .put_json(
            &format!("{ACCOUNTS}/a1"),
            &json!({ "username": "alice", "role": "viewer", "is_active": false }),
        )
        .await
        .unwrap();
    assert!(out.is_none());
}

#[tokio::test]
async fn base_path_prefix_is_preserved() {
    let server = MockServer::start().await;
    let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
    let base = Url::parse(&format!("{}/gateway/", server.uri())).unwrap();
    let pipeline = RequestPipeline::new(base, store, &TransportConfig::default()).unwrap();

    Mock::given(method("DELETE"))
        .and(path(format!("/gateway/{ACCOUNTS}/a1")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    pipeline.delete(&format!("/{ACCOUNTS}/a1")).await.unwrap();
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn login_prefers_explicit_role_and_username() {
    let (server, _store, pipeline) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/starpay-alert/login"))
        .and(body_json(json!({ "username": "alice", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "ok",
            "data": { "access_token": "jwt", "role": "admin", "username": "Alice" }
        })))
        .mount(&server)
        .await;

    let grant = pipeline
        .login("alice", &SecretString::from("pw".to_string()))
        .await
        .unwrap();

    assert_eq!(grant.token.expose_secret(), "jwt");
    assert_eq!(grant.role.as_deref(), Some("admin"));
    assert_eq!(grant.username.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn login_falls_back_to_roles_and_submitted_username() {
    let (server, _store, pipeline) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/starpay-alert/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "ok",
            "data": { "access_token": "opaque-token", "roles": ["operator", "viewer"] }
        })))
        .mount(&server)
        .await;

    let grant = pipeline
        .login("bob", &SecretString::from("pw".to_string()))
        .await
        .unwrap();

    assert_eq!(grant.role.as_deref(), Some("operator"));
    assert_eq!(grant.username.as_deref(), Some("bob"));
}

#[tokio::test]
async fn login_without_token_fails() {
    let (server, store, pipeline) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/starpay-alert/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": 200, "data": {} })),
        )
        .mount(&server)
        .await;

    let result = pipeline
        .login("bob", &SecretString::from("pw".to_string()))
        .await;

    assert!(matches!(result, Err(Error::MissingToken)), "got: {result:?}");
    assert!(!store.is_authenticated());
}
