use std::{borrow::Cow, fmt, sync::Arc};

use http::{HeaderMap, Uri};
use time::{Duration, OffsetDateTime};
use tower_cookies::Cookie;

use crate::{SameSite, error::ConfigError, format::SessionCookie};

pub const DEFAULT_COOKIE_NAME: &str = "AuthSession";
pub const DEFAULT_NEXT_PARAM: &str = "next";

/// Computes the value appended as the "next" query parameter of a login redirect.
pub type NextValueFn = Arc<dyn Fn(&Uri, &HeaderMap) -> String + Send + Sync>;

/// How a request is treated when no valid session can be established.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Unauthenticated requests are rejected or redirected.
    #[default]
    Required,
    /// Requests without a session cookie go through; an invalid session is rejected.
    Optional,
    /// Requests always go through unless a redirect applies.
    Try,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AppendNext {
    #[default]
    Disabled,
    /// Append using the `next` parameter.
    Enabled,
    /// Append using a custom parameter name.
    Param(Cow<'static, str>),
}

impl AppendNext {
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Disabled => None,
            Self::Enabled => Some(DEFAULT_NEXT_PARAM),
            Self::Param(name) => Some(name),
        }
    }
}

impl From<bool> for AppendNext {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl From<&'static str> for AppendNext {
    fn from(name: &'static str) -> Self {
        Self::Param(name.into())
    }
}

impl From<String> for AppendNext {
    fn from(name: String) -> Self {
        Self::Param(name.into())
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) http_only: bool,
    pub(crate) same_site: SameSite,
    pub(crate) secure: bool,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) max_age: Option<Duration>,
    pub(crate) mode: AuthMode,
    pub(crate) redirect_to: Option<Cow<'static, str>>,
    pub(crate) append_next: AppendNext,
    pub(crate) redirect_on_try: bool,
    pub(crate) username_param: Cow<'static, str>,
    pub(crate) password_param: Cow<'static, str>,
    pub(crate) query_login: bool,
    pub(crate) require_validator: bool,
    pub(crate) next_value: Option<NextValueFn>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            http_only: true,
            same_site: SameSite::Lax,
            secure: false,
            path: "/".into(),
            domain: None,
            max_age: None,
            mode: AuthMode::Required,
            redirect_to: None,
            append_next: AppendNext::Disabled,
            redirect_on_try: true,
            username_param: "username".into(),
            password_param: "password".into(),
            query_login: false,
            require_validator: false,
            next_value: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("name", &self.name)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("max_age", &self.max_age)
            .field("mode", &self.mode)
            .field("redirect_to", &self.redirect_to)
            .field("append_next", &self.append_next)
            .field("redirect_on_try", &self.redirect_on_try)
            .field("username_param", &self.username_param)
            .field("password_param", &self.password_param)
            .field("query_login", &self.query_login)
            .field("require_validator", &self.require_validator)
            .field("next_value", &self.next_value.as_ref().map(|_| ".."))
            .finish()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Path of the browser cookie, used both when setting and when clearing it.
    ///
    /// CouchDB's own `Path` attribute is not carried over.
    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    /// Lifetime of the browser cookie. Leave unset to follow CouchDB's own session timeout.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: AuthMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_redirect_to<R: Into<Cow<'static, str>>>(mut self, redirect_to: R) -> Self {
        self.redirect_to = Some(redirect_to.into());
        self
    }

    #[must_use]
    pub fn without_redirect(mut self) -> Self {
        self.redirect_to = None;
        self
    }

    #[must_use]
    pub fn with_append_next<A: Into<AppendNext>>(mut self, append_next: A) -> Self {
        self.append_next = append_next.into();
        self
    }

    #[must_use]
    pub fn with_redirect_on_try(mut self, redirect_on_try: bool) -> Self {
        self.redirect_on_try = redirect_on_try;
        self
    }

    #[must_use]
    pub fn with_username_param<P: Into<Cow<'static, str>>>(mut self, param: P) -> Self {
        self.username_param = param.into();
        self
    }

    #[must_use]
    pub fn with_password_param<P: Into<Cow<'static, str>>>(mut self, param: P) -> Self {
        self.password_param = param.into();
        self
    }

    /// Log in from the request query string when no session cookie is present.
    ///
    /// Off by default: credentials in URLs end up in access logs and `Referer` headers.
    #[must_use]
    pub fn with_query_login(mut self, query_login: bool) -> Self {
        self.query_login = query_login;
        self
    }

    #[must_use]
    pub fn with_require_validator(mut self, require_validator: bool) -> Self {
        self.require_validator = require_validator;
        self
    }

    #[must_use]
    pub fn with_next_value<F>(mut self, next_value: F) -> Self
    where
        F: Fn(&Uri, &HeaderMap) -> String + Send + Sync + 'static,
    {
        self.next_value = Some(Arc::new(next_value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }
        if self.username_param.is_empty() {
            return Err(ConfigError::EmptyParam("username"));
        }
        if self.password_param.is_empty() {
            return Err(ConfigError::EmptyParam("password"));
        }
        if self.username_param == self.password_param {
            return Err(ConfigError::DuplicateParams);
        }
        if let AppendNext::Param(name) = &self.append_next
            && name.is_empty()
        {
            return Err(ConfigError::EmptyNextParam);
        }
        if self.redirect_to.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyRedirect);
        }
        Ok(())
    }

    pub(crate) fn build_cookie(&self, session: SessionCookie) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), session.value))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone());

        if let Some(max_age) = self.max_age {
            cookie_builder = cookie_builder.max_age(max_age);
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }

    pub(crate) fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), ""))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH);

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }
}
