//! Helpers for reading the session cookie CouchDB issues on login.
//!
//! CouchDB answers `POST /_session` with a header like
//! `AuthSession=dGVzdGVyOjY1...; Version=1; Path=/; HttpOnly`. Only the value is carried over;
//! the browser cookie gets its attributes from [`AuthConfig`](crate::AuthConfig), so that setting
//! and clearing it always target the same path.

use tower_cookies::Cookie;

/// The remote session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub value: String,
}

/// Find the cookie called `name` among raw `Set-Cookie` header values.
///
/// Later headers win. Unparseable headers and empty values are skipped.
pub fn session_cookie<'a, I>(set_cookie: I, name: &str) -> Option<SessionCookie>
where
    I: IntoIterator<Item = &'a str>,
{
    set_cookie
        .into_iter()
        .filter_map(|header| match Cookie::parse(header) {
            Ok(cookie) => Some(cookie),
            Err(err) => {
                tracing::warn!(err = %err, "remote set-cookie header did not parse");
                None
            }
        })
        .filter(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .last()
        .map(|cookie| SessionCookie {
            value: cookie.value().to_string(),
        })
}
