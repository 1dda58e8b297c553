use std::borrow::Cow;

use http::StatusCode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The session backend could not be reached or did not answer.
///
/// This is never an authentication failure: a database that is down must not look like bad
/// credentials, so the layer answers these with a server error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("session backend unreachable")]
    Connect(#[source] BoxError),
    #[error("session backend timed out")]
    Timeout(#[source] BoxError),
    #[error("session backend request failed")]
    Request(#[source] BoxError),
}

impl TransportError {
    pub fn connect(err: impl Into<BoxError>) -> Self {
        Self::Connect(err.into())
    }

    pub fn timeout(err: impl Into<BoxError>) -> Self {
        Self::Timeout(err.into())
    }

    pub fn request(err: impl Into<BoxError>) -> Self {
        Self::Request(err.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing session credentials")]
    MissingCredentials,
    #[error("unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("session validator failed")]
    Validation(#[source] BoxError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AuthError {
    pub(crate) fn unauthorized(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(reason.into())
    }

    /// Whether the failure should surface as a server error rather than as unauthenticated.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingCredentials)
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_fatal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::UNAUTHORIZED
        }
    }
}

/// Raised while building an [`AuthConfig`](crate::AuthConfig), never per request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("session cookie name must not be empty")]
    EmptyCookieName,
    #[error("{0} parameter name must not be empty")]
    EmptyParam(&'static str),
    #[error("username and password parameters must differ")]
    DuplicateParams,
    #[error("next parameter name must not be empty")]
    EmptyNextParam,
    #[error("redirect target must not be empty")]
    EmptyRedirect,
    #[error("a session validator is required but none was configured")]
    MissingValidator,
}
