use std::sync::Arc;

use tower_cookies::Cookies;

use crate::{controller::CookieController, format::SessionCookie, strategy::Strategy};

/// A change to the session cookie, produced by resolution or login and applied by the layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    Set(SessionCookie),
    Clear,
}

pub(crate) trait DirectiveSink: Send + Sync {
    fn apply(&self, directive: &CookieDirective);
}

/// Writes directives into the response cookie jar of one request.
pub(crate) struct CookieWriter<C: CookieController> {
    cookies: Cookies,
    controller: C,
    strategy: Arc<Strategy>,
}

impl<C: CookieController> CookieWriter<C> {
    pub(crate) fn new(cookies: Cookies, controller: C, strategy: Arc<Strategy>) -> Self {
        Self {
            cookies,
            controller,
            strategy,
        }
    }

    /// The session token sent by the client, if any.
    pub(crate) fn token(&self) -> Option<String> {
        self.controller
            .get(&self.cookies, self.strategy.config.name())
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl<C: CookieController> DirectiveSink for CookieWriter<C> {
    fn apply(&self, directive: &CookieDirective) {
        match directive {
            CookieDirective::Set(session) => {
                let cookie = self.strategy.config.build_cookie(session.clone());
                self.controller.add(&self.cookies, cookie);
            }
            CookieDirective::Clear => {
                // Written unsigned and unconditionally: the header must go out even when the
                // client sent no cookie.
                self.cookies.add(self.strategy.config.removal_cookie());
            }
        }
    }
}
