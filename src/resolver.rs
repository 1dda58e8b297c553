//! Turns the session cookie of a request into credentials.

use std::sync::Arc;

use crate::{
    backend::{SessionBackend, SessionResponse},
    credentials::UserContext,
    error::{AuthError, TransportError},
    outcome::{AuthOutcome, Rejection},
    validate::{ValidationOutcome, Validator},
};

/// Result of resolving a session cookie.
///
/// `clear_cookie` is set when a cookie was presented but did not resolve to a valid session. The
/// resolver never touches the response itself.
#[derive(Debug)]
pub struct Resolution {
    pub outcome: AuthOutcome,
    pub clear_cookie: bool,
}

impl Resolution {
    fn keep(outcome: AuthOutcome) -> Self {
        Self {
            outcome,
            clear_cookie: false,
        }
    }

    fn clear(outcome: AuthOutcome) -> Self {
        Self {
            outcome,
            clear_cookie: true,
        }
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    backend: Arc<dyn SessionBackend>,
    validator: Option<Arc<dyn Validator>>,
}

impl SessionResolver {
    pub fn new(backend: Arc<dyn SessionBackend>, validator: Option<Arc<dyn Validator>>) -> Self {
        Self { backend, validator }
    }

    /// Look up `token` with the backend and validate the identity behind it.
    ///
    /// Only an unreachable backend is an `Err`; every answer the backend gives becomes a
    /// [`Resolution`].
    pub async fn resolve(&self, token: Option<&str>) -> Result<Resolution, TransportError> {
        let Some(token) = token else {
            return Ok(Resolution::keep(AuthOutcome::missing()));
        };

        let user = match self.backend.session(token).await? {
            SessionResponse::Active(user) if !user.is_anonymous() => user,
            SessionResponse::Active(_) => {
                tracing::debug!("session cookie maps to no active identity");
                return Ok(Resolution::clear(AuthOutcome::unauthorized(
                    "no active session",
                )));
            }
            SessionResponse::Rejected { reason } => {
                tracing::warn!(%reason, "session lookup rejected");
                return Ok(Resolution::clear(AuthOutcome::unauthorized(
                    "invalid session cookie",
                )));
            }
        };

        let outcome = evaluate(self.validator.as_deref(), user).await;
        let clear_cookie = !outcome.is_authenticated();
        Ok(Resolution {
            outcome,
            clear_cookie,
        })
    }
}

/// Run the optional validator against an identity the backend vouched for.
pub(crate) async fn evaluate(validator: Option<&dyn Validator>, user: UserContext) -> AuthOutcome {
    let Some(validator) = validator else {
        return AuthOutcome::Authenticated(user.into());
    };

    match validator.validate(&user).await {
        ValidationOutcome::Accepted(credentials) => {
            AuthOutcome::Authenticated(credentials.unwrap_or_else(|| user.into()))
        }
        ValidationOutcome::Rejected(credentials) => {
            tracing::debug!(user = ?user.name, "validator rejected session");
            AuthOutcome::Unauthenticated(Rejection::new(
                AuthError::unauthorized("invalid cookie"),
                credentials,
            ))
        }
        ValidationOutcome::Error(err) => {
            tracing::warn!(err = %err, user = ?user.name, "session validator failed");
            AuthOutcome::Unauthenticated(AuthError::Validation(err).into())
        }
    }
}
