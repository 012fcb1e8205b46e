//! Session propagation against a mock feed server

use feed_client::{
    logout, ApiClient, AuthFailurePolicy, ClientConfig, FeedStore, FetchOutcome, LoginForm,
    MemoryTokenStore, NoticeLevel, RegisterForm, ResourceKey, SessionState, SessionView,
    TokenStore,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(
    server: &MockServer,
    token: Option<&str>,
    policy: AuthFailurePolicy,
) -> (FeedStore, Arc<MemoryTokenStore>) {
    let tokens = Arc::new(match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let api = ApiClient::new(&server.uri(), tokens.clone()).unwrap();
    (FeedStore::new(api, policy), tokens)
}

fn alice() -> serde_json::Value {
    json!({"id": 1, "username": "alice", "is_active": true})
}

#[tokio::test]
async fn test_bearer_header_follows_token_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, Some("abc"), AuthFailurePolicy::Retain);
    assert!(store.refresh(ResourceKey::PostList).wait().await.is_applied());

    tokens.clear().unwrap();
    assert!(store.refresh(ResourceKey::PostList).wait().await.is_applied());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer abc"
    );
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_session_without_token_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .expect(0)
        .mount(&server)
        .await;

    let (store, _) = store_for(&server, None, AuthFailurePolicy::Retain);
    let view = SessionView::new(store);

    assert!(matches!(view.mount().wait().await, FetchOutcome::Skipped));
    assert_eq!(view.state(), SessionState::LoginRequired);
    assert_eq!(view.render(), "login required");
}

#[tokio::test]
async fn test_login_stores_exact_token_and_loads_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=wonderland"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "xyz", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .and(header("authorization", "Bearer xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, None, AuthFailurePolicy::Retain);
    store.beliefs().set(9, true);

    let mut form = LoginForm::new("alice", "wonderland");
    let submitted = form.submit(&store).await.unwrap();
    assert_eq!(tokens.get(), Some("xyz".to_string()));
    assert!(!store.beliefs().is_liked(9));

    let message = form.message.clone().unwrap();
    assert_eq!(message.level, NoticeLevel::Success);
    assert_eq!(message.message, "login succeeded, token stored");

    let (token, outcomes) = submitted.settle().await;
    assert_eq!(token.access_token, "xyz");
    assert!(outcomes[0].is_applied());

    let view = SessionView::new(store);
    assert_eq!(view.render(), "user #1 alice (active)");
}

#[tokio::test]
async fn test_login_sends_username_as_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("username=alice+&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "xyz"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, None, AuthFailurePolicy::Retain);
    let mut form = LoginForm::new("alice ", "wonderland");

    form.submit(&store).await.unwrap().settle().await;
    assert_eq!(tokens.get(), Some("xyz".to_string()));
}

#[tokio::test]
async fn test_login_failure_shows_detail_and_keeps_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Incorrect username or password"})),
        )
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, None, AuthFailurePolicy::Clear);
    let mut form = LoginForm::new("alice", "wrong-password");

    let err = form.submit(&store).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert_eq!(tokens.get(), None);
    assert_eq!(form.username, "alice");
    assert_eq!(form.password, "wrong-password");
    assert_eq!(
        form.message.unwrap().message,
        "login failed: Incorrect username or password"
    );
}

#[tokio::test]
async fn test_session_failure_keeps_token_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, Some("expired"), AuthFailurePolicy::Retain);
    let view = SessionView::new(store);

    let outcome = view.mount().wait().await;
    assert!(matches!(outcome, FetchOutcome::Failed(ref err) if err.is_unauthenticated()));
    assert_eq!(tokens.get(), Some("expired".to_string()));
    assert_eq!(
        view.state(),
        SessionState::Failed("Could not validate credentials".into())
    );
}

#[tokio::test]
async fn test_session_failure_without_detail_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (store, _) = store_for(&server, Some("abc"), AuthFailurePolicy::Retain);
    let view = SessionView::new(store);
    view.mount().wait().await;

    assert_eq!(view.render(), "failed to load user: request failed");
}

#[tokio::test]
async fn test_clear_policy_drops_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, Some("expired"), AuthFailurePolicy::Clear);
    store.beliefs().set(3, true);
    let view = SessionView::new(store.clone());

    view.mount().wait().await;

    assert_eq!(tokens.get(), None);
    assert!(!store.beliefs().is_liked(3));
    assert_eq!(view.state(), SessionState::LoginRequired);
}

#[tokio::test]
async fn test_logout_resets_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, Some("abc"), AuthFailurePolicy::Retain);
    let view = SessionView::new(store.clone());
    view.mount().wait().await;
    assert!(view.state().user().is_some());

    let mut subscriber = store.subscribe();
    logout(&store).unwrap();

    assert_eq!(tokens.get(), None);
    assert_eq!(view.state(), SessionState::LoginRequired);
    let notice = subscriber.try_recv().unwrap();
    assert_eq!(notice.cache_key(), "session");
}

#[tokio::test]
async fn test_register_creates_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/"))
        .and(body_json(json!({"username": "alice", "password": "wonderland"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_for(&server, None, AuthFailurePolicy::Retain);
    let mut form = RegisterForm::new("alice", "wonderland");

    let submitted = form.submit(&store).await.unwrap();
    assert_eq!(submitted.created.username, "alice");
    assert!(submitted.refetches.is_empty());
    assert_eq!(form.message.unwrap().message, "user alice registered");
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn test_register_duplicate_shows_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Username already registered"})),
        )
        .mount(&server)
        .await;

    let (store, _) = store_for(&server, None, AuthFailurePolicy::Retain);
    let mut form = RegisterForm::new("alice", "wonderland");

    let err = form.submit(&store).await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(form.username, "alice");
    assert_eq!(
        form.message.unwrap().message,
        "register failed: Username already registered"
    );
}

#[tokio::test]
async fn test_file_backed_session_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "durable"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .and(header("authorization", "Bearer durable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = ClientConfig::for_base_url(server.uri());
    config.token_path = dir.path().join("tokens.json");

    let store = FeedStore::from_config(&config).unwrap();
    LoginForm::new("alice", "wonderland")
        .submit(&store)
        .await
        .unwrap()
        .settle()
        .await;
    drop(store);

    let restarted = FeedStore::from_config(&config).unwrap();
    assert!(restarted.has_token());
    let view = SessionView::new(restarted);
    assert!(view.mount().wait().await.is_applied());
    assert_eq!(view.state().user().unwrap().username, "alice");
}
