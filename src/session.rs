use std::{fmt, sync::Arc};

use crate::{
    credentials::Credentials,
    directive::DirectiveSink,
    error::{AuthError, TransportError},
    outcome::Rejection,
    strategy::Strategy,
};

/// What the layer concluded about the current request.
///
/// Inserted into request extensions before the inner service runs, and into the extensions of
/// `401` responses the layer produces itself.
#[derive(Debug, Clone)]
pub enum AuthState {
    Authenticated(Credentials),
    Unauthenticated {
        error: Arc<AuthError>,
        credentials: Option<Credentials>,
    },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Authenticated(credentials) => Some(credentials),
            Self::Unauthenticated { credentials, .. } => credentials.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&AuthError> {
        match self {
            Self::Authenticated(_) => None,
            Self::Unauthenticated { error, .. } => Some(error),
        }
    }
}

impl From<Rejection> for AuthState {
    fn from(rejection: Rejection) -> Self {
        Self::Unauthenticated {
            error: Arc::new(rejection.error),
            credentials: rejection.credentials,
        }
    }
}

/// Per-request handle for logging in and out.
///
/// Cookie changes made through it are written to the response of the same request.
#[derive(Clone)]
pub struct AuthSession {
    strategy: Arc<Strategy>,
    sink: Arc<dyn DirectiveSink>,
    token: Option<String>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    pub(crate) fn new(
        strategy: Arc<Strategy>,
        sink: Arc<dyn DirectiveSink>,
        token: Option<String>,
    ) -> Self {
        Self {
            strategy,
            sink,
            token,
        }
    }

    /// The session token presented by the client on this request.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in with CouchDB and set the session cookie on success.
    ///
    /// Never redirects: the handler decides where to go next.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credentials, Rejection> {
        let login = self
            .strategy
            .broker()
            .login(username, password)
            .await
            .map_err(|err| {
                tracing::error!(err = %err, "session backend unavailable during login");
                Rejection::from(AuthError::from(err))
            })?;

        if let Some(directive) = &login.directive {
            self.sink.apply(directive);
        }

        login.outcome.into_result()
    }

    /// End the session and clear the cookie.
    ///
    /// The cookie is cleared even when CouchDB cannot be reached; that failure is returned
    /// afterwards.
    pub async fn clear(&self) -> Result<(), TransportError> {
        let logout = self.strategy.broker().logout(self.token.as_deref()).await;
        self.sink.apply(&logout.directive);
        match logout.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "axum")]
mod extract {
    use axum_core::extract::FromRequestParts;
    use http::{StatusCode, request::Parts};

    use super::{AuthSession, AuthState};
    use crate::credentials::Credentials;

    impl<S> FromRequestParts<S> for AuthSession
    where
        S: Send + Sync,
    {
        type Rejection = (StatusCode, &'static str);

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            parts.extensions.get::<AuthSession>().cloned().ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't extract auth session. Is `AuthLayer` enabled?",
            ))
        }
    }

    impl<S> FromRequestParts<S> for AuthState
    where
        S: Send + Sync,
    {
        type Rejection = (StatusCode, &'static str);

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            parts.extensions.get::<AuthState>().cloned().ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't extract auth state. Is `AuthLayer` enabled?",
            ))
        }
    }

    impl<S> FromRequestParts<S> for Credentials
    where
        S: Send + Sync,
    {
        type Rejection = (StatusCode, &'static str);

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            match parts.extensions.get::<AuthState>() {
                Some(AuthState::Authenticated(credentials)) => Ok(credentials.clone()),
                Some(AuthState::Unauthenticated { .. }) => {
                    Err((StatusCode::UNAUTHORIZED, "Not authenticated"))
                }
                None => Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Can't extract credentials. Is `AuthLayer` enabled?",
                )),
            }
        }
    }
}
