use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::{entity_names, not_found};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    flash::{self, Flash},
    models::{ListFilter, PersonForm},
    views::{self, Layout, PersonFormPage, PersonListPage, PersonRow},
};

/// list_persons
///
/// GET /persons?entity_id=...&q=... Newest first. Each row carries its entity's
/// name when the entity still exists.
pub async fn list_persons(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let all = ListFilter::default();
    let (persons, entities) = tokio::try_join!(
        state.repo.list_persons(&filter),
        state.repo.list_entities(&all),
    )?;

    let names = entity_names(&entities);
    let persons = persons
        .into_iter()
        .map(|person| PersonRow {
            entity_name: names.get(&person.entity_id).cloned(),
            person,
        })
        .collect();

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = PersonListPage {
        layout,
        persons,
        q: views::search_term(&filter),
        entity_options: views::entity_options(&entities, filter.entity_id),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// new_person
///
/// GET /persons/new. `?entity_id=` preselects the owning entity.
pub async fn new_person(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let entities = state.repo.list_entities(&ListFilter::default()).await?;

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = PersonFormPage {
        layout,
        heading: "New person".to_string(),
        submit_to: "/persons/new".to_string(),
        form: PersonForm::default(),
        entity_options: views::entity_options(&entities, filter.entity_id),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /persons/new
pub async fn create_person(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PersonForm>,
) -> Result<Response, AppError> {
    let person = state.repo.create_person(form).await?;
    tracing::info!(id = person.id, entity_id = person.entity_id, by = %user.email, "person created");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Person \"{}\" created.", person.name)),
        "/persons",
    )
    .into_response())
}

/// GET /persons/{id}/edit
pub async fn edit_person(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(person) = state.repo.get_person(id).await? else {
        return Ok(not_found(jar, "Person", id, "/persons"));
    };
    let entities = state.repo.list_entities(&ListFilter::default()).await?;

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = PersonFormPage {
        layout,
        heading: format!("Edit {}", person.name),
        submit_to: format!("/persons/{id}/edit"),
        entity_options: views::entity_options(&entities, Some(person.entity_id)),
        form: PersonForm::from(&person),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /persons/{id}/edit
pub async fn update_person(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<PersonForm>,
) -> Result<Response, AppError> {
    let Some(person) = state.repo.update_person(id, form).await? else {
        return Ok(not_found(jar, "Person", id, "/persons"));
    };
    tracing::info!(id, by = %user.email, "person updated");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Person \"{}\" updated.", person.name)),
        "/persons",
    )
    .into_response())
}

/// POST /persons/{id}/delete
pub async fn delete_person(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if !state.repo.delete_person(id).await? {
        return Ok(not_found(jar, "Person", id, "/persons"));
    }
    tracing::info!(id, by = %user.email, "person deleted");

    Ok(flash::redirect(jar, Flash::success("Person deleted."), "/persons").into_response())
}
