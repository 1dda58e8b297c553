#![cfg(feature = "private")]

// The private controller encrypts the CouchDB token before it reaches the browser.
mod common;

use std::sync::Arc;

use axum::body::Body;
use common::MemoryCouch;
use http::{Request, header};
use tower::ServiceExt as _;

use tower_couchdb_cookie::{AuthLayer, Key};

#[tokio::test]
async fn private_cookie_hides_token() {
    // Exercise: log in through a private layer, then reuse the browser cookie.
    // Expectation: the browser never sees the raw token, yet the session resolves.
    let couch = Arc::new(MemoryCouch::new());
    let app = common::whoami_routes(AuthLayer::builder(couch.clone()).private(Key::generate()));

    let req = Request::builder()
        .uri("/whoami?username=tester&password=pw")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    let session_cookie = common::get_session_cookie(&res);

    assert!(couch.has_session("tester-session-0"));
    assert!(!session_cookie.value().contains("tester-session-0"));

    let req = Request::builder()
        .uri("/whoami")
        .header(header::COOKIE, common::cookie_header_value(&session_cookie))
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");

    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(common::body_string(res.into_body()).await, "tester");
}

#[tokio::test]
async fn raw_token_is_not_accepted() {
    // A client that learned the raw CouchDB token cannot present it directly.
    let couch = Arc::new(MemoryCouch::new());
    let app = common::whoami_routes(AuthLayer::builder(couch).private(Key::generate()));

    let req = Request::builder()
        .uri("/whoami?username=tester&password=pw")
        .body(Body::empty())
        .expect("request builds successfully");
    app.clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");

    let req = Request::builder()
        .uri("/whoami")
        .header(header::COOKIE, "AuthSession=tester-session-0")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");

    assert_eq!(common::body_string(res.into_body()).await, "none");
}
