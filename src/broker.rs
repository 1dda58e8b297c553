//! Logs users in and out against the session backend.

use std::sync::Arc;

use crate::{
    backend::SessionBackend,
    directive::CookieDirective,
    error::TransportError,
    format,
    outcome::AuthOutcome,
    resolver::evaluate,
    validate::Validator,
};

#[derive(Debug)]
pub struct LoginResult {
    pub outcome: AuthOutcome,
    /// Present only when the login was accepted by both the backend and the validator.
    pub directive: Option<CookieDirective>,
}

impl LoginResult {
    fn rejected(reason: &'static str) -> Self {
        Self {
            outcome: AuthOutcome::unauthorized(reason),
            directive: None,
        }
    }
}

#[derive(Debug)]
pub struct LogoutResult {
    pub directive: CookieDirective,
    /// Set when the backend could not be told about the logout. The cookie is cleared anyway.
    pub error: Option<TransportError>,
}

#[derive(Clone)]
pub struct SessionBroker {
    backend: Arc<dyn SessionBackend>,
    validator: Option<Arc<dyn Validator>>,
}

impl SessionBroker {
    pub fn new(backend: Arc<dyn SessionBackend>, validator: Option<Arc<dyn Validator>>) -> Self {
        Self { backend, validator }
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResult, TransportError> {
        let response = self.backend.login(username, password).await?;
        if !response.ok {
            tracing::debug!(username, "backend refused login");
            return Ok(LoginResult::rejected("invalid username or password"));
        }

        let Some(session) = format::session_cookie(
            response.set_cookie.iter().map(String::as_str),
            self.backend.cookie_name(),
        ) else {
            tracing::warn!(username, "login succeeded without a session cookie");
            return Ok(LoginResult::rejected("no session issued"));
        };

        let outcome = evaluate(self.validator.as_deref(), response.user).await;
        let directive = outcome
            .is_authenticated()
            .then_some(CookieDirective::Set(session));

        Ok(LoginResult { outcome, directive })
    }

    /// End the remote session, if there is one. Always yields [`CookieDirective::Clear`].
    pub async fn logout(&self, token: Option<&str>) -> LogoutResult {
        let error = match token {
            Some(token) => self.backend.logout(token).await.err(),
            None => None,
        };

        if let Some(err) = &error {
            tracing::warn!(err = %err, "remote logout failed");
        }

        LogoutResult {
            directive: CookieDirective::Clear,
            error,
        }
    }
}
