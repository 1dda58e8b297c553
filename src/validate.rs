use std::future::Future;

use async_trait::async_trait;

use crate::{
    credentials::{Credentials, UserContext},
    error::BoxError,
};

/// Verdict of a [`Validator`] on a remote session.
#[derive(Debug)]
pub enum ValidationOutcome {
    /// The validator itself failed. Treated as a rejection.
    Error(BoxError),
    /// The session is not acceptable. Partial credentials are kept with the failure.
    Rejected(Option<Credentials>),
    /// The session is accepted, optionally with replacement credentials.
    Accepted(Option<Credentials>),
}

impl ValidationOutcome {
    pub fn accept() -> Self {
        Self::Accepted(None)
    }

    pub fn accept_with(credentials: Credentials) -> Self {
        Self::Accepted(Some(credentials))
    }

    pub fn reject() -> Self {
        Self::Rejected(None)
    }

    pub fn reject_with(credentials: Credentials) -> Self {
        Self::Rejected(Some(credentials))
    }

    pub fn error(err: impl Into<BoxError>) -> Self {
        Self::Error(err.into())
    }

    /// Accept or reject depending on `valid`, keeping `credentials` either way.
    pub fn from_verdict(valid: bool, credentials: Option<Credentials>) -> Self {
        if valid {
            Self::Accepted(credentials)
        } else {
            Self::Rejected(credentials)
        }
    }
}

/// Local check run on every session CouchDB vouches for, before it reaches handlers.
///
/// Implemented for async closures taking the [`UserContext`] by value:
///
/// ```
/// use tower_couchdb_cookie::{Credentials, UserContext, ValidationOutcome};
///
/// let validator = |user: UserContext| async move {
///     let valid = user.name.as_deref() == Some("tester");
///     ValidationOutcome::from_verdict(valid, Some(Credentials::from(user).with("checked", true)))
/// };
/// # let _ = validator;
/// ```
#[async_trait]
pub trait Validator: Send + Sync + 'static {
    async fn validate(&self, user: &UserContext) -> ValidationOutcome;
}

#[async_trait]
impl<F, Fut> Validator for F
where
    F: Fn(UserContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ValidationOutcome> + Send + 'static,
{
    async fn validate(&self, user: &UserContext) -> ValidationOutcome {
        self(user.clone()).await
    }
}
