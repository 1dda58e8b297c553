//! CouchDB cookie-session authentication for `tower` and `axum`.
//!
//! [`AuthLayer`] authenticates every request against CouchDB's `/_session` endpoint. The
//! `AuthSession` cookie issued by CouchDB is relayed to the browser; on each request the layer
//! sends it back to CouchDB, turns the answer into [`Credentials`] and either lets the request
//! through, rejects it with `401`, or redirects it to a login page.
//!
//! Nothing is cached between requests: CouchDB stays the only source of truth for sessions.
//!
//! # Outcomes
//!
//! - A valid session attaches [`Credentials`] and [`AuthState::Authenticated`] to the request.
//! - A missing or invalid session is handed to the [`FailurePolicy`], which picks `401` or a
//!   `302` to the configured login page. In [`AuthMode::Try`] a rejection lets the request
//!   through with [`AuthState::Unauthenticated`].
//! - A cookie that CouchDB no longer accepts is cleared on the same response.
//! - An unreachable CouchDB yields `500`, never `401`.
//!
//! # Logging in
//!
//! Handlers log users in and out through the [`AuthSession`] request extension. The layer comes
//! out of [`AuthLayerBuilder::build`], which rejects an invalid configuration up front:
//!
//! ```no_run
//! use axum::{Form, Router, response::Redirect, routing::post};
//! use serde::Deserialize;
//! use tower_couchdb_cookie::{AuthConfig, AuthLayer, AuthMode, AuthSession, RouteOverride};
//!
//! #[derive(Deserialize)]
//! struct Login {
//!     username: String,
//!     password: String,
//! }
//!
//! async fn login(session: AuthSession, Form(form): Form<Login>) -> Redirect {
//!     match session.authenticate(&form.username, &form.password).await {
//!         Ok(_) => Redirect::to("/"),
//!         Err(_) => Redirect::to("/login"),
//!     }
//! }
//!
//! # fn main() -> Result<(), tower_couchdb_cookie::ConfigError> {
//! let auth = AuthLayer::couchdb("http://localhost:5984")
//!     .with_config(AuthConfig::default().with_redirect_to("/login"))
//!     .build()?;
//! let app: Router = Router::new()
//!     .route("/login", post(login))
//!     .route_layer(auth.for_route(RouteOverride::new().with_mode(AuthMode::Try)));
//! # Ok(())
//! # }
//! ```

mod backend;
mod broker;
mod config;
mod controller;
#[cfg(feature = "couchdb")]
mod couch;
mod credentials;
mod directive;
mod error;
mod format;
pub mod layer;
mod outcome;
mod policy;
mod resolver;
mod session;
mod strategy;
mod validate;

pub use tower_cookies::cookie::SameSite;

#[cfg(any(feature = "signed", feature = "private"))]
pub use tower_cookies::Key;

pub use crate::backend::{LoginResponse, SessionBackend, SessionResponse};
pub use crate::broker::{LoginResult, LogoutResult, SessionBroker};
pub use crate::config::{
    AppendNext, AuthConfig, AuthMode, DEFAULT_COOKIE_NAME, DEFAULT_NEXT_PARAM, NextValueFn,
};
pub use crate::controller::{CookieController, PlaintextCookie};
pub use crate::credentials::{Credentials, UserContext};
pub use crate::directive::CookieDirective;
pub use crate::format::{SessionCookie, session_cookie};
pub use crate::error::{AuthError, BoxError, ConfigError, TransportError};
pub use crate::layer::{AUTH_SCHEME, AuthLayer, AuthLayerBuilder, AuthService};
pub use crate::outcome::{AuthOutcome, Rejection};
pub use crate::policy::{Decision, FailedRequest, FailurePolicy, RedirectOverride, RouteOverride};
pub use crate::resolver::{Resolution, SessionResolver};
pub use crate::session::{AuthSession, AuthState};
pub use crate::validate::{ValidationOutcome, Validator};

#[cfg(feature = "couchdb")]
pub use crate::couch::{CouchClient, DEFAULT_COUCHDB_URL};

#[cfg(feature = "signed")]
pub use crate::controller::SignedCookie;

#[cfg(feature = "private")]
pub use crate::controller::PrivateCookie;
