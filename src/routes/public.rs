use crate::{AppState, handlers::auth};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that work with or without a session. Nothing here reads or writes
/// resource data.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers. Never touches the store.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Redirects to /welcome with a session, /login without.
        .route("/", get(auth::home))
        // GET/POST /login
        // Form display and credential check. A failed check redisplays the form.
        .route("/login", get(auth::login_form).post(auth::login))
        // GET/POST /logout
        // Clears the session cookie; safe to hit without one.
        .route("/logout", get(auth::logout).post(auth::logout))
}
