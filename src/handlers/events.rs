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
    models::{EventForm, ListFilter},
    views::{self, EVENT_TYPES, EventFormPage, EventListPage, Layout},
};

/// list_events
///
/// GET /events?entity_id=...&q=... `q` matches the related entity's name and is
/// evaluated by the store as part of the query, not after the fetch.
pub async fn list_events(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let all = ListFilter::default();
    let (events, entities) = tokio::try_join!(
        state.repo.list_events(&filter),
        state.repo.list_entities(&all),
    )?;

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = EventListPage {
        layout,
        events,
        q: views::search_term(&filter),
        entity_options: views::entity_options(&entities, filter.entity_id),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// Renders the event form with every entity and person as a choice.
async fn event_form_page(
    state: &AppState,
    layout: Layout,
    heading: String,
    submit_to: String,
    form: EventForm,
) -> Result<EventFormPage, AppError> {
    let all = ListFilter::default();
    let (entities, persons) = tokio::try_join!(
        state.repo.list_entities(&all),
        state.repo.list_persons(&all),
    )?;

    let selected_entity = (form.entity_id != 0).then_some(form.entity_id);
    Ok(EventFormPage {
        layout,
        heading,
        submit_to,
        entity_options: views::entity_options(&entities, selected_entity),
        person_options: views::person_options(&persons, form.person_id),
        type_options: views::choice_options(EVENT_TYPES, &form.event_type),
        form,
    })
}

/// new_event
///
/// GET /events/new. `?entity_id=` preselects the entity.
pub async fn new_event(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let form = EventForm {
        entity_id: filter.entity_id.unwrap_or_default(),
        ..EventForm::default()
    };

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = event_form_page(
        &state,
        layout,
        "New event".to_string(),
        "/events/new".to_string(),
        form,
    )
    .await?;
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /events/new
pub async fn create_event(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<EventForm>,
) -> Result<Response, AppError> {
    let event = state.repo.create_event(form).await?;
    tracing::info!(id = event.id, entity_id = event.entity_id, by = %user.email, "event created");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Event \"{}\" created.", event.title)),
        "/events",
    )
    .into_response())
}

/// GET /events/{id}/edit
pub async fn edit_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(event) = state.repo.get_event(id).await? else {
        return Ok(not_found(jar, "Event", id, "/events"));
    };

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = event_form_page(
        &state,
        layout,
        format!("Edit {}", event.title),
        format!("/events/{id}/edit"),
        EventForm::from(&event),
    )
    .await?;
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /events/{id}/edit
pub async fn update_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<EventForm>,
) -> Result<Response, AppError> {
    let Some(event) = state.repo.update_event(id, form).await? else {
        return Ok(not_found(jar, "Event", id, "/events"));
    };
    tracing::info!(id, by = %user.email, "event updated");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Event \"{}\" updated.", event.title)),
        "/events",
    )
    .into_response())
}

/// POST /events/{id}/delete
pub async fn delete_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if !state.repo.delete_event(id).await? {
        return Ok(not_found(jar, "Event", id, "/events"));
    }
    tracing::info!(id, by = %user.email, "event deleted");

    Ok(flash::redirect(jar, Flash::success("Event deleted."), "/events").into_response())
}
