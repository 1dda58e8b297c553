//! Decides what an unauthenticated request turns into: a rejection or a login redirect.

use std::borrow::Cow;

use http::{HeaderMap, Uri};

use crate::{
    config::{AuthConfig, AuthMode},
    outcome::Rejection,
};

/// Redirect behaviour set on a single route, overriding the layer's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOverride {
    Disabled,
    To(Cow<'static, str>),
}

/// Settings attached to one route with [`AuthLayer::for_route`](crate::AuthLayer::for_route).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOverride {
    pub(crate) redirect_to: Option<RedirectOverride>,
    pub(crate) mode: Option<AuthMode>,
}

impl RouteOverride {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_redirect_to<R: Into<Cow<'static, str>>>(mut self, redirect_to: R) -> Self {
        self.redirect_to = Some(RedirectOverride::To(redirect_to.into()));
        self
    }

    /// Never redirect on this route, whatever the layer is configured with.
    #[must_use]
    pub fn without_redirect(mut self) -> Self {
        self.redirect_to = Some(RedirectOverride::Disabled);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: AuthMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn mode(&self) -> Option<AuthMode> {
        self.mode
    }
}

#[derive(Debug)]
pub enum Decision {
    Reject(Rejection),
    Redirect { location: String },
}

/// The request being failed, as far as the policy needs to know it.
#[derive(Debug, Clone, Copy)]
pub struct FailedRequest<'a> {
    pub mode: AuthMode,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
}

#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy<'a> {
    config: &'a AuthConfig,
    route: Option<&'a RouteOverride>,
}

impl<'a> FailurePolicy<'a> {
    pub fn new(config: &'a AuthConfig, route: Option<&'a RouteOverride>) -> Self {
        Self { config, route }
    }

    pub fn decide(&self, request: FailedRequest<'_>, rejection: Rejection) -> Decision {
        match self.location(request) {
            Some(location) => Decision::Redirect { location },
            None => Decision::Reject(rejection),
        }
    }

    fn target(&self) -> Option<&str> {
        let target = match self.route.and_then(|route| route.redirect_to.as_ref()) {
            Some(RedirectOverride::Disabled) => None,
            Some(RedirectOverride::To(target)) => Some(target.as_ref()),
            None => self.config.redirect_to.as_deref(),
        };
        target.filter(|target| !target.is_empty())
    }

    fn location(&self, request: FailedRequest<'_>) -> Option<String> {
        if request.mode == AuthMode::Try && !self.config.redirect_on_try {
            return None;
        }

        let mut location = self.target()?.to_string();

        if let Some(param) = self.config.append_next.param_name() {
            let next = match &self.config.next_value {
                Some(next_value) => next_value(request.uri, request.headers),
                None => {
                    let path = request
                        .uri
                        .path_and_query()
                        .map_or("/", |path| path.as_str());
                    urlencoding::encode(path).into_owned()
                }
            };

            location.push(if location.contains('?') { '&' } else { '?' });
            location.push_str(param);
            location.push('=');
            location.push_str(&next);
        }

        Some(location)
    }
}
