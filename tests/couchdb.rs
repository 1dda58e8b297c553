#![cfg(feature = "couchdb")]

// Tests for `CouchClient` against a local stand-in for CouchDB's `/_session` endpoint.
mod common;

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use http::Request;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceExt as _;
use tower_couchdb_cookie::{
    AuthLayer, AuthSession, CouchClient, Credentials, SessionBackend, SessionResponse,
};

#[derive(Default)]
struct FakeCouch {
    sessions: Mutex<HashSet<String>>,
}

#[derive(Deserialize)]
struct LoginForm {
    name: String,
    password: String,
}

fn token_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("AuthSession="))
        .map(str::to_string)
        .next()
}

async fn post_session(
    State(couch): State<Arc<FakeCouch>>,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.name != "tester" || form.password != "pw" {
        let body = json!({"error": "unauthorized", "reason": "Name or password is incorrect."});
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    let token = format!("dGVzdGVy{}", couch.sessions.lock().expect("sessions lock").len());
    couch
        .sessions
        .lock()
        .expect("sessions lock")
        .insert(token.clone());

    let set_cookie = format!("AuthSession={token}; Version=1; Path=/; HttpOnly");
    let body = json!({"ok": true, "name": "tester", "roles": ["_admin"]});
    ([(header::SET_COOKIE, set_cookie)], Json(body)).into_response()
}

async fn get_session(State(couch): State<Arc<FakeCouch>>, headers: HeaderMap) -> Response {
    let known = token_of(&headers)
        .is_some_and(|token| couch.sessions.lock().expect("sessions lock").contains(&token));

    let user_ctx = if known {
        json!({"name": "tester", "roles": ["_admin"]})
    } else {
        json!({"name": null, "roles": []})
    };
    let body = json!({
        "ok": true,
        "userCtx": user_ctx,
        "info": {"authentication_handlers": ["cookie", "default"]},
    });
    Json(body).into_response()
}

async fn delete_session(State(couch): State<Arc<FakeCouch>>, headers: HeaderMap) -> Response {
    if let Some(token) = token_of(&headers) {
        couch.sessions.lock().expect("sessions lock").remove(&token);
    }
    (
        [(header::SET_COOKIE, "AuthSession=; Version=1; Path=/; HttpOnly")],
        Json(json!({"ok": true})),
    )
        .into_response()
}

async fn serve() -> (String, Arc<FakeCouch>) {
    let couch = Arc::new(FakeCouch::default());
    let app = Router::new()
        .route(
            "/_session",
            get(get_session).post(post_session).delete(delete_session),
        )
        .with_state(couch.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds successfully");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("fake couchdb serves");
    });

    (format!("http://{addr}"), couch)
}

fn app(url: &str) -> Router {
    Router::new()
        .route(
            "/resource",
            get(|credentials: Credentials| async move {
                let admin = credentials.has_role("_admin");
                format!("{} admin={admin}", credentials.name().unwrap_or("nobody"))
            }),
        )
        .route(
            "/logout",
            get(|session: AuthSession| async move {
                match session.clear().await {
                    Ok(()) => "logged-out",
                    Err(_) => "logged-out locally",
                }
            }),
        )
        .layer(
            AuthLayer::couchdb(url)
                .with_config(common::query_login_config())
                .build()
                .expect("auth config is valid"),
        )
}

#[tokio::test]
async fn client_login_collects_cookie() {
    let (url, _) = serve().await;
    let client = CouchClient::new(&url);

    let login = client
        .login("tester", "pw")
        .await
        .expect("couchdb is reachable");

    assert!(login.ok);
    assert_eq!(login.user.name.as_deref(), Some("tester"));
    assert_eq!(login.user.roles, vec!["_admin".to_string()]);
    assert_eq!(login.set_cookie.len(), 1);
    assert!(login.set_cookie[0].starts_with("AuthSession=dGVzdGVy0"));
}

#[tokio::test]
async fn client_login_with_wrong_password() {
    let (url, _) = serve().await;

    let login = CouchClient::new(&url)
        .login("tester", "wrong")
        .await
        .expect("couchdb is reachable");

    assert!(!login.ok);
    assert!(login.set_cookie.is_empty());
}

#[tokio::test]
async fn client_session_lookup() {
    let (url, _) = serve().await;
    let client = CouchClient::new(&url);
    client
        .login("tester", "pw")
        .await
        .expect("couchdb is reachable");

    let active = client
        .session("dGVzdGVy0")
        .await
        .expect("couchdb is reachable");
    assert!(matches!(active, SessionResponse::Active(ref user) if !user.is_anonymous()));

    let unknown = client
        .session("bogus")
        .await
        .expect("couchdb is reachable");
    assert!(matches!(unknown, SessionResponse::Active(ref user) if user.is_anonymous()));
}

#[tokio::test]
async fn client_logout_ends_session() {
    let (url, couch) = serve().await;
    let client = CouchClient::new(&url);
    client
        .login("tester", "pw")
        .await
        .expect("couchdb is reachable");

    client
        .logout("dGVzdGVy0")
        .await
        .expect("couchdb is reachable");

    assert!(couch.sessions.lock().expect("sessions lock").is_empty());
}

#[tokio::test]
async fn layer_logs_in_resolves_and_logs_out() {
    // Exercise: the full layer against the fake server: query login, reuse, logout, reuse.
    // Expectation: the cookie works until logout, after which it is rejected and cleared.
    let (url, couch) = serve().await;
    let app = app(&url);

    let req = Request::builder()
        .uri("/resource?username=tester&password=pw")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    assert_eq!(res.status(), StatusCode::OK);
    let session_cookie = common::get_session_cookie(&res);
    assert_eq!(session_cookie.value(), "dGVzdGVy0");
    assert_eq!(common::body_string(res.into_body()).await, "tester admin=true");

    let cookie = common::cookie_header_value(&session_cookie);
    let req = Request::builder()
        .uri("/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    common::assert_cleared(&common::get_session_cookie(&res));
    assert_eq!(common::body_string(res.into_body()).await, "logged-out");
    assert!(couch.sessions.lock().expect("sessions lock").is_empty());

    let req = Request::builder()
        .uri("/resource")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    common::assert_cleared(&common::get_session_cookie(&res));
}

#[tokio::test]
async fn unreachable_couchdb_is_server_error() {
    // Bind then drop a listener so the port is known to refuse connections.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds successfully");
    let addr = listener.local_addr().expect("listener has an address");
    drop(listener);

    let req = Request::builder()
        .uri("/resource")
        .header(header::COOKIE, "AuthSession=dGVzdGVy0")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app(&format!("http://{addr}"))
        .oneshot(req)
        .await
        .expect("service call succeeds");

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
}
