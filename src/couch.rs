//! [`SessionBackend`] for CouchDB's `/_session` endpoint.

use std::borrow::Cow;

use async_trait::async_trait;
use http::header;
use serde::Deserialize;

use crate::{
    backend::{LoginResponse, SessionBackend, SessionResponse},
    config::DEFAULT_COOKIE_NAME,
    credentials::UserContext,
    error::TransportError,
};

pub const DEFAULT_COUCHDB_URL: &str = "http://localhost:5984";

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    ok: bool,
    #[serde(flatten)]
    user: UserContext,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    #[serde(rename = "userCtx")]
    user_ctx: UserContext,
}

#[derive(Debug, Clone)]
pub struct CouchClient {
    client: reqwest::Client,
    session_url: String,
    cookie_name: Cow<'static, str>,
}

impl Default for CouchClient {
    fn default() -> Self {
        Self::new(DEFAULT_COUCHDB_URL)
    }
}

impl CouchClient {
    pub fn new<U: AsRef<str>>(url: U) -> Self {
        Self {
            client: reqwest::Client::new(),
            session_url: format!("{}/_session", url.as_ref().trim_end_matches('/')),
            cookie_name: DEFAULT_COOKIE_NAME.into(),
        }
    }

    /// Use a preconfigured client, e.g. one with request timeouts.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_cookie_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn session_url(&self) -> &str {
        &self.session_url
    }

    fn cookie_header(&self, token: &str) -> String {
        format!("{}={}", self.cookie_name, token)
    }
}

fn transport(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(err)
    } else if err.is_connect() {
        TransportError::connect(err)
    } else {
        TransportError::request(err)
    }
}

#[async_trait]
impl SessionBackend for CouchClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, TransportError> {
        let res = self
            .client
            .post(&self.session_url)
            .header(header::ACCEPT, "application/json")
            .form(&[("name", username), ("password", password)])
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        let set_cookie = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();

        if !status.is_success() {
            tracing::debug!(%status, "couchdb refused login");
            return Ok(LoginResponse {
                ok: false,
                set_cookie,
                ..LoginResponse::default()
            });
        }

        match res.json::<LoginBody>().await {
            Ok(body) => Ok(LoginResponse {
                ok: body.ok,
                user: body.user,
                set_cookie,
            }),
            Err(err) if err.is_decode() => {
                tracing::warn!(err = %err, "couchdb login response did not decode");
                Ok(LoginResponse {
                    ok: false,
                    set_cookie,
                    ..LoginResponse::default()
                })
            }
            Err(err) => Err(transport(err)),
        }
    }

    async fn session(&self, token: &str) -> Result<SessionResponse, TransportError> {
        let res = self
            .client
            .get(&self.session_url)
            .header(header::ACCEPT, "application/json")
            .header(header::COOKIE, self.cookie_header(token))
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if !status.is_success() {
            return Ok(SessionResponse::Rejected {
                reason: format!("couchdb answered {status}").into(),
            });
        }

        match res.json::<SessionBody>().await {
            Ok(body) => Ok(SessionResponse::Active(body.user_ctx)),
            Err(err) if err.is_decode() => Ok(SessionResponse::Rejected {
                reason: format!("undecodable session body: {err}").into(),
            }),
            Err(err) => Err(transport(err)),
        }
    }

    async fn logout(&self, token: &str) -> Result<(), TransportError> {
        let res = self
            .client
            .delete(&self.session_url)
            .header(header::COOKIE, self.cookie_header(token))
            .send()
            .await
            .map_err(transport)?;

        if !res.status().is_success() {
            tracing::debug!(status = %res.status(), "couchdb refused logout");
        }
        Ok(())
    }

    fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}
