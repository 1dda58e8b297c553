#![allow(dead_code)]

// Shared helpers for integration tests.
//
// `MemoryCouch` stands in for CouchDB's `/_session` endpoint: it issues `AuthSession` cookies the
// way CouchDB formats them and remembers which token belongs to which user.
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::body::Body;
use http::{HeaderMap, Response, header};
use http_body_util::BodyExt as _;
use tower_cookies::Cookie;
use tower_couchdb_cookie::{
    AuthConfig, AuthLayerBuilder, LoginResponse, SessionBackend, SessionResponse, TransportError,
    UserContext,
};

#[derive(Debug, Default)]
pub struct MemoryCouch {
    users: Mutex<HashMap<String, (String, Vec<String>)>>,
    sessions: Mutex<HashMap<String, UserContext>>,
    next_token: AtomicUsize,
    down: AtomicBool,
    omit_path: bool,
    pub session_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl MemoryCouch {
    pub fn new() -> Self {
        Self::default().with_user("tester", "pw", &[])
    }

    pub fn with_user(self, name: &str, password: &str, roles: &[&str]) -> Self {
        self.users.lock().expect("users lock").insert(
            name.to_string(),
            (
                password.to_string(),
                roles.iter().map(|r| r.to_string()).collect(),
            ),
        );
        self
    }

    /// Issue cookies without a `Path` attribute.
    pub fn without_cookie_path(mut self) -> Self {
        self.omit_path = true;
        self
    }

    /// Simulate a refused connection on every call.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Forget every session, as if they had all expired on the server.
    pub fn expire_all(&self) {
        self.sessions.lock().expect("sessions lock").clear();
    }

    pub fn has_session(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .expect("sessions lock")
            .contains_key(token)
    }

    fn check_up(&self) -> Result<(), TransportError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(TransportError::connect("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for MemoryCouch {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, TransportError> {
        self.check_up()?;

        let roles = match self.users.lock().expect("users lock").get(username) {
            Some((expected, roles)) if expected == password => roles.clone(),
            // CouchDB accepts any name with a bad password as a 401; there is no user to report.
            _ => return Ok(LoginResponse::default()),
        };

        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("{username}-session-{n}");
        let user = UserContext {
            name: Some(username.to_string()),
            roles,
            ..UserContext::default()
        };
        self.sessions
            .lock()
            .expect("sessions lock")
            .insert(token.clone(), user.clone());

        let set_cookie = if self.omit_path {
            format!("AuthSession={token}; Version=1; HttpOnly")
        } else {
            format!("AuthSession={token}; Version=1; Path=/; HttpOnly")
        };
        Ok(LoginResponse {
            ok: true,
            user,
            set_cookie: vec![set_cookie],
        })
    }

    async fn session(&self, token: &str) -> Result<SessionResponse, TransportError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;

        // Unknown tokens come back as an anonymous userCtx, like CouchDB does.
        let user = self
            .sessions
            .lock()
            .expect("sessions lock")
            .get(token)
            .cloned()
            .unwrap_or_default();
        Ok(SessionResponse::Active(user))
    }

    async fn logout(&self, token: &str) -> Result<(), TransportError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.sessions.lock().expect("sessions lock").remove(token);
        Ok(())
    }
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    // Parse every `Set-Cookie` header of a response.
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let value = value.to_str().expect("set-cookie header is valid utf-8");
            Cookie::parse_encoded(value)
                .expect("set-cookie parses successfully")
                .into_owned()
        })
        .collect()
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    // Convenience: the single session cookie set on a response.
    let mut cookies = set_cookies(res.headers());
    assert_eq!(cookies.len(), 1, "response sets exactly one cookie");
    cookies.remove(0)
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Encode a cookie for use in a `Cookie` request header.
    cookie.encoded().to_string()
}

pub fn assert_cleared(cookie: &Cookie<'_>) {
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
}

pub fn tamper_cookie_value(cookie: &mut Cookie<'_>) {
    // Flip the last character of a cookie value.
    let mut value = cookie.value().to_string();
    let last = value
        .pop()
        .expect("cookie value has at least one character");
    let replacement = if last == 'A' { 'B' } else { 'A' };
    value.push(replacement);
    cookie.set_value(value);
}

/// Default config with login from query parameters switched on.
pub fn query_login_config() -> AuthConfig {
    AuthConfig::default().with_query_login(true)
}

/// A try-mode route answering with the authenticated user name, or `none`.
pub fn whoami_routes<C: tower_couchdb_cookie::CookieController>(
    builder: AuthLayerBuilder<C>,
) -> axum::Router {
    use tower_couchdb_cookie::{AuthMode, AuthState, Credentials};

    let layer = builder
        .with_config(query_login_config().with_mode(AuthMode::Try))
        .build()
        .expect("auth config is valid");
    axum::Router::new().route(
        "/whoami",
        axum::routing::get(|state: AuthState| async move {
            match state.credentials().and_then(Credentials::name) {
                Some(name) if state.is_authenticated() => name.to_string(),
                _ => "none".to_string(),
            }
        })
        .layer(layer),
    )
}
