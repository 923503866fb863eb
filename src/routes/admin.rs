use crate::{AppState, handlers::auth};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes only an admin session may use. Each handler takes the `AdminUser`
/// extractor, which redirects anonymous requests to /login and refuses member
/// sessions with an authorization message.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /register
        // Creates a new login account. Duplicate emails redisplay the form.
        .route("/register", get(auth::register_form).post(auth::register))
}
