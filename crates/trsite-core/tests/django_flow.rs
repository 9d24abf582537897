//! End-to-end: `DjangoClient` against a mock backend, session on disk.

use std::sync::{Arc, Mutex};

use serde_json::json;
use trsite_core::auth::SESSION_KEY;
use trsite_core::{
    ApiError, AuthError, Credentials, DjangoClient, FileStore, KeyValueStore, Session,
    SessionAuthenticator,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .and(body_json(json!({"username": "jane@doe.com", "password": "password"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .and(body_json(json!({"username": "jane@doe.com", "password": "wrong"})))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Username or password invalid"})),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn login_then_logout_round_trip() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout/"))
        .and(header("authorization", "Token tok-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let client = Arc::new(DjangoClient::new(&server.uri()).unwrap());
    let auth = SessionAuthenticator::new(client.clone(), store.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = auth.subscribe(move |s: &Option<Session>| sink.lock().unwrap().push(s.clone()));

    let session = auth
        .login(&Credentials::new("jane@doe.com", "password"))
        .await
        .unwrap();
    assert_eq!(session, Session::new("tok-1"));
    assert_eq!(store.retrieve(SESSION_KEY).unwrap(), Some(json!({"token": "tok-1"})));
    assert_eq!(client.token().as_deref(), Some("tok-1"));

    auth.logout().unwrap().await.unwrap();

    assert_eq!(store.retrieve(SESSION_KEY).unwrap(), None);
    assert_eq!(client.token(), None);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![None, Some(Session::new("tok-1")), None]
    );
}

#[tokio::test]
async fn bad_password_is_rejected_without_side_effects() {
    let server = backend().await;
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let client = Arc::new(DjangoClient::new(&server.uri()).unwrap());
    let auth = SessionAuthenticator::new(client.clone(), store.clone());

    let err = auth
        .login(&Credentials::new("jane@doe.com", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::Api(ApiError::Unauthorized(ref m)) if m == "Username or password invalid"
    ));
    assert_eq!(store.retrieve(SESSION_KEY).unwrap(), None);
    assert_eq!(auth.current(), None);
    assert_eq!(client.token(), None);
}

#[tokio::test]
async fn session_survives_restart() {
    let server = backend().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let client = Arc::new(DjangoClient::new(&server.uri()).unwrap());
        let auth = SessionAuthenticator::new(client, FileStore::new(dir.path()).unwrap());
        auth.login(&Credentials::new("jane@doe.com", "password"))
            .await
            .unwrap();
    }

    // A fresh client picks the token up from disk
    let client = Arc::new(DjangoClient::new(&server.uri()).unwrap());
    let auth = SessionAuthenticator::new(client.clone(), FileStore::new(dir.path()).unwrap());
    assert_eq!(auth.current(), Some(Session::new("tok-1")));
    assert_eq!(client.token().as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn unreachable_backend_on_logout_still_logs_out() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let client = Arc::new(DjangoClient::new(&server.uri()).unwrap());
    let auth = SessionAuthenticator::new(client, store.clone());
    auth.login(&Credentials::new("jane@doe.com", "password"))
        .await
        .unwrap();

    auth.logout().unwrap().await.unwrap();
    assert_eq!(store.retrieve(SESSION_KEY).unwrap(), None);
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn full_response_body_is_stored() {
    let server = MockServer::start().await;
    let body = json!({"token": "tok-1", "id": 7, "username": "jane", "first_name": "Jane"});
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let client = Arc::new(DjangoClient::new(&server.uri()).unwrap());
    let auth = SessionAuthenticator::new(client.clone(), store.clone());
    auth.login(&Credentials::new("jane", "password")).await.unwrap();

    assert_eq!(store.retrieve(SESSION_KEY).unwrap(), Some(body));
    let restored = SessionAuthenticator::new(client, store);
    assert_eq!(restored.current(), auth.current());
}
