use crate::{AppState, handlers::api};
use axum::{Router, routing::get};

/// API Router Module
///
/// JSON views over the same store, nested under `/api`. Handlers take the
/// `ApiUser` extractor: no session means 401, never a redirect.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(api::get_me))
        // GET|POST /api/users
        // Admin only; member sessions get 403.
        .route("/users", get(api::list_users).post(api::create_user))
        .route("/entities", get(api::list_entities))
        .route("/entities/{id}", get(api::get_entity))
        .route("/persons", get(api::list_persons))
        .route("/events", get(api::list_events))
        .route("/actions", get(api::list_actions))
}
