use crate::{
    AppState,
    handlers::{actions, auth, entities, events, persons},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// The HTML portal. The whole router sits behind `auth_middleware`, so no
/// handler here runs (or queries the store) without a valid session.
///
/// Every resource follows the same shape: a list, a create form posted back to
/// `/new`, an edit form posted back to `/{id}/edit`, and a POST-only delete.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/welcome", get(auth::welcome))
        .route(
            "/change_password",
            get(auth::change_password_form).post(auth::change_password),
        )
        // --- Entities ---
        .route("/entities", get(entities::list_entities))
        .route(
            "/entities/new",
            get(entities::new_entity).post(entities::create_entity),
        )
        // GET /entities/{id}
        // Detail page aggregating the entity, its events and its actions.
        .route("/entities/{id}", get(entities::entity_detail))
        .route(
            "/entities/{id}/edit",
            get(entities::edit_entity).post(entities::update_entity),
        )
        .route("/entities/{id}/delete", post(entities::delete_entity))
        // --- Persons ---
        .route("/persons", get(persons::list_persons))
        .route(
            "/persons/new",
            get(persons::new_person).post(persons::create_person),
        )
        .route(
            "/persons/{id}/edit",
            get(persons::edit_person).post(persons::update_person),
        )
        .route("/persons/{id}/delete", post(persons::delete_person))
        // --- Events ---
        // GET /events?q=...
        // `q` searches the related entity's name inside the store query.
        .route("/events", get(events::list_events))
        .route(
            "/events/new",
            get(events::new_event).post(events::create_event),
        )
        .route(
            "/events/{id}/edit",
            get(events::edit_event).post(events::update_event),
        )
        .route("/events/{id}/delete", post(events::delete_event))
        // --- Actions ---
        .route("/actions", get(actions::list_actions))
        .route(
            "/actions/new",
            get(actions::new_action).post(actions::create_action),
        )
        .route(
            "/actions/{id}/edit",
            get(actions::edit_action).post(actions::update_action),
        )
        .route("/actions/{id}/delete", post(actions::delete_action))
}
