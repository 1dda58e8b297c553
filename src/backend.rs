use std::{borrow::Cow, fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::{config::DEFAULT_COOKIE_NAME, credentials::UserContext, error::TransportError};

/// Answer to a login attempt from a reachable backend.
#[derive(Debug, Clone, Default)]
pub struct LoginResponse {
    pub ok: bool,
    pub user: UserContext,
    /// Raw `Set-Cookie` header values returned with the answer.
    pub set_cookie: Vec<String>,
}

/// Answer to a session lookup from a reachable backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionResponse {
    /// The token maps to a session. The user may still be anonymous.
    Active(UserContext),
    /// The backend refused the token or answered with something unusable.
    Rejected { reason: Cow<'static, str> },
}

/// The remote session store.
///
/// Implementations only report [`TransportError`] when the store could not be reached; any answer
/// the store does give (bad password, unknown token) is returned as data.
#[async_trait]
pub trait SessionBackend: Debug + Send + Sync + 'static {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, TransportError>;

    async fn session(&self, token: &str) -> Result<SessionResponse, TransportError>;

    async fn logout(&self, token: &str) -> Result<(), TransportError>;

    /// Name of the cookie the store issues its session token under.
    fn cookie_name(&self) -> &str {
        DEFAULT_COOKIE_NAME
    }
}

#[async_trait]
impl<B: SessionBackend + ?Sized> SessionBackend for Arc<B> {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, TransportError> {
        (**self).login(username, password).await
    }

    async fn session(&self, token: &str) -> Result<SessionResponse, TransportError> {
        (**self).session(token).await
    }

    async fn logout(&self, token: &str) -> Result<(), TransportError> {
        (**self).logout(token).await
    }

    fn cookie_name(&self) -> &str {
        (**self).cookie_name()
    }
}
