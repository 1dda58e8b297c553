use crate::{credentials::Credentials, error::AuthError};

/// An authentication failure together with whatever credentials were produced on the way.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Rejection {
    #[source]
    pub error: AuthError,
    pub credentials: Option<Credentials>,
}

impl Rejection {
    pub fn new(error: AuthError, credentials: Option<Credentials>) -> Self {
        Self { error, credentials }
    }
}

impl From<AuthError> for Rejection {
    fn from(error: AuthError) -> Self {
        Self::new(error, None)
    }
}

#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated(Credentials),
    Unauthenticated(Rejection),
}

impl AuthOutcome {
    pub(crate) fn missing() -> Self {
        Self::Unauthenticated(AuthError::MissingCredentials.into())
    }

    pub(crate) fn unauthorized(reason: &'static str) -> Self {
        Self::Unauthenticated(AuthError::unauthorized(reason).into())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Authenticated(credentials) => Some(credentials),
            Self::Unauthenticated(rejection) => rejection.credentials.as_ref(),
        }
    }

    pub fn into_result(self) -> Result<Credentials, Rejection> {
        match self {
            Self::Authenticated(credentials) => Ok(credentials),
            Self::Unauthenticated(rejection) => Err(rejection),
        }
    }
}
