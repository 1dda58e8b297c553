use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{HeaderValue, Request, Response, StatusCode, header};
use tower_cookies::CookieManager;
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    backend::SessionBackend,
    config::{AuthConfig, AuthMode},
    controller::{CookieController, PlaintextCookie},
    directive::{CookieDirective, CookieWriter, DirectiveSink},
    error::ConfigError,
    outcome::AuthOutcome,
    policy::{Decision, FailedRequest, FailurePolicy, RouteOverride},
    resolver::Resolution,
    session::{AuthSession, AuthState},
    strategy::Strategy,
    validate::Validator,
};

/// Scheme announced in `WWW-Authenticate` on `401` responses.
pub const AUTH_SCHEME: &str = "couchdb-cookie";

/// Collects the backend, configuration and validator of an [`AuthLayer`].
///
/// A builder is not a `Layer`: [`build`](Self::build) checks the configuration and is the only
/// way to get one, so a misconfigured layer never serves traffic.
///
/// ```compile_fail
/// # use axum::{Router, routing::get};
/// # use tower_couchdb_cookie::AuthLayer;
/// let app: Router = Router::new()
///     .route("/", get(|| async { "hello" }))
///     .layer(AuthLayer::couchdb("http://localhost:5984"));
/// ```
#[derive(Clone)]
pub struct AuthLayerBuilder<C: CookieController = PlaintextCookie> {
    strategy: Strategy,
    controller: C,
}

impl AuthLayerBuilder<PlaintextCookie> {
    /// Sign the session cookie sent to the browser.
    #[cfg(feature = "signed")]
    #[must_use]
    pub fn signed(self, key: crate::Key) -> AuthLayerBuilder<crate::SignedCookie> {
        self.with_controller(crate::SignedCookie::new(key))
    }

    /// Encrypt the session cookie sent to the browser.
    #[cfg(feature = "private")]
    #[must_use]
    pub fn private(self, key: crate::Key) -> AuthLayerBuilder<crate::PrivateCookie> {
        self.with_controller(crate::PrivateCookie::new(key))
    }
}

impl<C: CookieController> AuthLayerBuilder<C> {
    #[must_use]
    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.strategy.config = config;
        self
    }

    #[must_use]
    pub fn with_validator<V: Validator>(mut self, validator: V) -> Self {
        self.strategy.validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn with_controller<C2: CookieController>(self, controller: C2) -> AuthLayerBuilder<C2> {
        AuthLayerBuilder {
            strategy: self.strategy,
            controller,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.strategy.config
    }

    /// Check the configuration and produce the layer.
    pub fn build(self) -> Result<AuthLayer<C>, ConfigError> {
        self.strategy.config.validate()?;
        if self.strategy.config.require_validator && self.strategy.validator.is_none() {
            return Err(ConfigError::MissingValidator);
        }
        Ok(AuthLayer {
            strategy: Arc::new(self.strategy),
            controller: self.controller,
            route: None,
        })
    }
}

/// Authenticates requests against the session backend. Created with [`AuthLayer::builder`].
#[derive(Clone)]
pub struct AuthLayer<C: CookieController = PlaintextCookie> {
    strategy: Arc<Strategy>,
    controller: C,
    route: Option<Arc<RouteOverride>>,
}

impl AuthLayer<PlaintextCookie> {
    #[must_use]
    pub fn builder<B: SessionBackend>(backend: B) -> AuthLayerBuilder<PlaintextCookie> {
        AuthLayerBuilder {
            strategy: Strategy {
                config: AuthConfig::default(),
                backend: Arc::new(backend),
                validator: None,
            },
            controller: PlaintextCookie,
        }
    }

    /// Builder for a layer talking to CouchDB at `url`.
    #[cfg(feature = "couchdb")]
    #[must_use]
    pub fn couchdb<U: AsRef<str>>(url: U) -> AuthLayerBuilder<PlaintextCookie> {
        Self::builder(crate::couch::CouchClient::new(url))
    }
}

impl<C: CookieController> AuthLayer<C> {
    /// A copy of this layer carrying settings for a single route.
    ///
    /// ```no_run
    /// # use axum::{Router, routing::get};
    /// # use tower_couchdb_cookie::{AuthLayer, ConfigError, RouteOverride};
    /// # fn main() -> Result<(), ConfigError> {
    /// let auth = AuthLayer::couchdb("http://localhost:5984").build()?;
    /// let app: Router = Router::new()
    ///     .route("/api", get(|| async { "api" }))
    ///     .route_layer(auth.for_route(RouteOverride::new().without_redirect()));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn for_route(&self, route: RouteOverride) -> Self {
        Self {
            strategy: self.strategy.clone(),
            controller: self.controller.clone(),
            route: Some(Arc::new(route)),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.strategy.config
    }
}

#[derive(Clone)]
pub struct AuthService<S, C: CookieController> {
    inner: S,
    strategy: Arc<Strategy>,
    controller: C,
    route: Option<Arc<RouteOverride>>,
}

impl<S, C: CookieController> Layer<S> for AuthLayer<C> {
    type Service = CookieManager<AuthService<S, C>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(AuthService {
            inner,
            strategy: self.strategy.clone(),
            controller: self.controller.clone(),
            route: self.route.clone(),
        })
    }
}

fn status_response<B: Default>(status: StatusCode) -> Response<B> {
    let mut res = Response::default();
    *res.status_mut() = status;
    res
}

fn query_credentials(query: Option<&str>, config: &AuthConfig) -> Option<(String, String)> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query?).ok()?;
    let find = |param: &str| {
        pairs
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.clone())
    };
    Some((find(&config.username_param)?, find(&config.password_param)?))
}

impl<ReqBody, ResBody, S, C> Service<Request<ReqBody>> for AuthService<S, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    C: CookieController,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let strategy = self.strategy.clone();
        let controller = self.controller.clone();
        let route = self.route.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let cookies = match req.extensions().get::<tower_cookies::Cookies>().cloned() {
                Some(cookies) => cookies,
                None => return Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR)),
            };

            let config = &strategy.config;
            let writer = Arc::new(CookieWriter::new(cookies, controller, strategy.clone()));
            let token = writer.token();
            let mode = route
                .as_deref()
                .and_then(RouteOverride::mode)
                .unwrap_or(config.mode);

            req.extensions_mut().insert(AuthSession::new(
                strategy.clone(),
                writer.clone(),
                token.clone(),
            ));

            let login = match token {
                None if config.query_login => query_credentials(req.uri().query(), config),
                _ => None,
            };

            let resolution = match login {
                Some((username, password)) => {
                    strategy
                        .broker()
                        .login(&username, &password)
                        .await
                        .map(|login| {
                            if let Some(directive) = &login.directive {
                                writer.apply(directive);
                            }
                            Resolution {
                                outcome: login.outcome,
                                clear_cookie: false,
                            }
                        })
                }
                None => strategy.resolver().resolve(token.as_deref()).await,
            };

            let resolution = match resolution {
                Ok(resolution) => resolution,
                Err(err) => {
                    tracing::error!(err = %err, "session backend unavailable");
                    return Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR));
                }
            };

            if resolution.clear_cookie {
                writer.apply(&CookieDirective::Clear);
            }

            let rejection = match resolution.outcome {
                AuthOutcome::Authenticated(credentials) => {
                    tracing::debug!(user = ?credentials.name, "request authenticated");
                    req.extensions_mut().insert(credentials.clone());
                    req.extensions_mut()
                        .insert(AuthState::Authenticated(credentials));
                    return inner.call(req).await;
                }
                AuthOutcome::Unauthenticated(rejection) => rejection,
            };

            if mode == AuthMode::Optional && rejection.error.is_missing() {
                req.extensions_mut().insert(AuthState::from(rejection));
                return inner.call(req).await;
            }

            let policy = FailurePolicy::new(config, route.as_deref());
            let failed = FailedRequest {
                mode,
                uri: req.uri(),
                headers: req.headers(),
            };

            match policy.decide(failed, rejection) {
                Decision::Redirect { location } => {
                    tracing::debug!(%location, "redirecting unauthenticated request");
                    let Ok(location) = HeaderValue::try_from(location) else {
                        tracing::error!("redirect location is not a valid header value");
                        return Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR));
                    };
                    let mut res = status_response(StatusCode::FOUND);
                    res.headers_mut().insert(header::LOCATION, location);
                    Ok(res)
                }
                Decision::Reject(rejection) if mode == AuthMode::Try => {
                    tracing::debug!(err = %rejection, "continuing unauthenticated request");
                    req.extensions_mut().insert(AuthState::from(rejection));
                    inner.call(req).await
                }
                Decision::Reject(rejection) => {
                    tracing::debug!(err = %rejection, "rejecting unauthenticated request");
                    let mut res = status_response(StatusCode::UNAUTHORIZED);
                    res.headers_mut()
                        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_SCHEME));
                    res.extensions_mut().insert(AuthState::from(rejection));
                    Ok(res)
                }
            }
        })
    }
}
