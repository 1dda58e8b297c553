use std::net::SocketAddr;

use axum::{
    Form, Router,
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_couchdb_cookie::{
    AuthConfig, AuthLayer, AuthMode, AuthSession, Credentials, RouteOverride, SameSite,
};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct Login {
    username: String,
    password: String,
}

async fn index(credentials: Credentials) -> Html<String> {
    let name = credentials.name().unwrap_or("stranger");
    Html(format!(
        "<html><head><title>Welcome</title></head><body><h3>Welcome {name}!</h3><br/>\
         <form method=\"post\" action=\"/logout\"><input type=\"submit\" value=\"Logout\">\
         </form></body></html>"
    ))
}

async fn login_page() -> Html<&'static str> {
    Html(
        "<html><head><title>Login page</title></head><body>\
         <form method=\"post\" action=\"/login\">\
         Username: <input type=\"text\" name=\"username\"><br>\
         Password: <input type=\"password\" name=\"password\"><br/>\
         <input type=\"submit\" value=\"Login\"></form></body></html>",
    )
}

async fn login(session: AuthSession, Form(form): Form<Login>) -> Redirect {
    if let Err(rejection) = session.authenticate(&form.username, &form.password).await {
        tracing::info!(err = %rejection, user = %form.username, "login failed");
    }
    Redirect::to("/")
}

async fn logout(session: AuthSession) -> Redirect {
    if let Err(err) = session.clear().await {
        tracing::warn!(err = %err, "couchdb did not end the session");
    }
    Redirect::to("/")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tower_couchdb_cookie=debug,info")),
        )
        .init();

    let couchdb_url =
        std::env::var("COUCHDB_URL").unwrap_or_else(|_| "http://localhost:5984".to_string());

    let auth_config = AuthConfig::default()
        // Default: "AuthSession"
        .with_name("AuthSession")
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Lax
        .with_same_site(SameSite::Lax)
        // Default: false
        .with_secure(false)
        // Default: None
        .with_redirect_to("/login")
        // Default: true
        .with_redirect_on_try(false)
        // Default: false
        .with_query_login(false);
    let auth = AuthLayer::couchdb(couchdb_url)
        .with_config(auth_config)
        .build()
        .expect("auth configuration is valid");
    let try_auth = auth.for_route(RouteOverride::new().with_mode(AuthMode::Try));

    let app = Router::new()
        .route("/", get(index).layer(auth.clone()))
        .route("/logout", post(logout).layer(auth))
        .route("/login", get(login_page).post(login).layer(try_auth));

    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    tracing::info!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
