use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use std::collections::HashMap;

use crate::{
    flash::{self, Flash},
    models::Entity,
};

/// HTML handlers, one module per resource. Every mutation ends in a 303 to the
/// resource's list view with a flash message (redirect-after-post).
pub mod actions;
pub mod auth;
pub mod entities;
pub mod events;
pub mod persons;

/// JSON handlers, listed in the OpenAPI document.
pub mod api;

/// Sends the browser back to `list` after a lookup by an id that does not exist.
pub(crate) fn not_found(jar: CookieJar, label: &str, id: i64, list: &str) -> Response {
    tracing::debug!(id, "{} not found", label);
    flash::redirect(jar, Flash::error(format!("{label} #{id} was not found.")), list)
        .into_response()
}

/// Entity names by id, for list pages that show the owning entity.
pub(crate) fn entity_names(entities: &[Entity]) -> HashMap<i64, String> {
    entities.iter().map(|e| (e.id, e.name.clone())).collect()
}
