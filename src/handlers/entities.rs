use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::not_found;
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    flash::{self, Flash},
    models::{EntityForm, ListFilter},
    views::{self, EntityDetailPage, EntityFormPage, EntityListPage, Layout},
};

/// list_entities
///
/// GET /entities?q=... Newest first, optionally narrowed by a name search.
pub async fn list_entities(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let entities = state.repo.list_entities(&filter).await?;

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = EntityListPage {
        layout,
        entities,
        q: views::search_term(&filter),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// entity_detail
///
/// GET /entities/{id}. The entity with its events (with person names) and actions.
/// The three reads are independent store queries; a missing entity redirects.
pub async fn entity_detail(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let related = ListFilter::for_entity(id);
    let (entity, events, actions) = tokio::try_join!(
        state.repo.get_entity(id),
        state.repo.list_events(&related),
        state.repo.list_actions(&related),
    )?;

    let Some(entity) = entity else {
        return Ok(not_found(jar, "Entity", id, "/entities"));
    };

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = EntityDetailPage {
        layout,
        entity,
        events,
        actions,
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// GET /entities/new
pub async fn new_entity(user: AuthUser, jar: CookieJar) -> Result<Response, AppError> {
    let (jar, layout) = Layout::take(jar, Some(user));
    let page = EntityFormPage {
        layout,
        heading: "New entity".to_string(),
        submit_to: "/entities/new".to_string(),
        form: EntityForm::default(),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /entities/new
pub async fn create_entity(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<EntityForm>,
) -> Result<Response, AppError> {
    let entity = state.repo.create_entity(form).await?;
    tracing::info!(id = entity.id, by = %user.email, "entity created");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Entity \"{}\" created.", entity.name)),
        "/entities",
    )
    .into_response())
}

/// GET /entities/{id}/edit
pub async fn edit_entity(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(entity) = state.repo.get_entity(id).await? else {
        return Ok(not_found(jar, "Entity", id, "/entities"));
    };

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = EntityFormPage {
        layout,
        heading: format!("Edit {}", entity.name),
        submit_to: format!("/entities/{id}/edit"),
        form: EntityForm::from(&entity),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /entities/{id}/edit
pub async fn update_entity(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<EntityForm>,
) -> Result<Response, AppError> {
    let Some(entity) = state.repo.update_entity(id, form).await? else {
        return Ok(not_found(jar, "Entity", id, "/entities"));
    };
    tracing::info!(id, by = %user.email, "entity updated");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Entity \"{}\" updated.", entity.name)),
        "/entities",
    )
    .into_response())
}

/// delete_entity
///
/// POST /entities/{id}/delete. Persons, events and actions that point at the
/// entity are left alone.
pub async fn delete_entity(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if !state.repo.delete_entity(id).await? {
        return Ok(not_found(jar, "Entity", id, "/entities"));
    }
    tracing::info!(id, by = %user.email, "entity deleted");

    Ok(flash::redirect(jar, Flash::success("Entity deleted."), "/entities").into_response())
}
