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
    models::{ActionForm, ListFilter},
    views::{
        self, ACTION_PRIORITIES, ACTION_STATUSES, ActionFormPage, ActionListPage, ActionRow,
        Layout,
    },
};

/// list_actions
///
/// GET /actions?entity_id=...&q=... Latest due date first, undated actions last.
pub async fn list_actions(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let all = ListFilter::default();
    let (actions, entities) = tokio::try_join!(
        state.repo.list_actions(&filter),
        state.repo.list_entities(&all),
    )?;

    let names = entity_names(&entities);
    let actions = actions
        .into_iter()
        .map(|action| ActionRow {
            entity_name: names.get(&action.entity_id).cloned(),
            action,
        })
        .collect();

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = ActionListPage {
        layout,
        actions,
        q: views::search_term(&filter),
        entity_options: views::entity_options(&entities, filter.entity_id),
    };
    Ok((jar, views::render(&page)?).into_response())
}

async fn action_form_page(
    state: &AppState,
    layout: Layout,
    heading: String,
    submit_to: String,
    form: ActionForm,
) -> Result<ActionFormPage, AppError> {
    let entities = state.repo.list_entities(&ListFilter::default()).await?;

    let selected_entity = (form.entity_id != 0).then_some(form.entity_id);
    Ok(ActionFormPage {
        layout,
        heading,
        submit_to,
        entity_options: views::entity_options(&entities, selected_entity),
        status_options: views::choice_options(ACTION_STATUSES, &form.status),
        priority_options: views::choice_options(ACTION_PRIORITIES, &form.priority),
        form,
    })
}

/// new_action
///
/// GET /actions/new. `?entity_id=` preselects the entity.
pub async fn new_action(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let form = ActionForm {
        entity_id: filter.entity_id.unwrap_or_default(),
        ..ActionForm::default()
    };

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = action_form_page(
        &state,
        layout,
        "New action".to_string(),
        "/actions/new".to_string(),
        form,
    )
    .await?;
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /actions/new
pub async fn create_action(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ActionForm>,
) -> Result<Response, AppError> {
    let action = state.repo.create_action(form).await?;
    tracing::info!(id = action.id, entity_id = action.entity_id, by = %user.email, "action created");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Action \"{}\" created.", action.title)),
        "/actions",
    )
    .into_response())
}

/// GET /actions/{id}/edit
pub async fn edit_action(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(action) = state.repo.get_action(id).await? else {
        return Ok(not_found(jar, "Action", id, "/actions"));
    };

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = action_form_page(
        &state,
        layout,
        format!("Edit {}", action.title),
        format!("/actions/{id}/edit"),
        ActionForm::from(&action),
    )
    .await?;
    Ok((jar, views::render(&page)?).into_response())
}

/// POST /actions/{id}/edit
pub async fn update_action(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<ActionForm>,
) -> Result<Response, AppError> {
    let Some(action) = state.repo.update_action(id, form).await? else {
        return Ok(not_found(jar, "Action", id, "/actions"));
    };
    tracing::info!(id, by = %user.email, "action updated");

    Ok(flash::redirect(
        jar,
        Flash::success(format!("Action \"{}\" updated.", action.title)),
        "/actions",
    )
    .into_response())
}

/// POST /actions/{id}/delete
pub async fn delete_action(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if !state.repo.delete_action(id).await? {
        return Ok(not_found(jar, "Action", id, "/actions"));
    }
    tracing::info!(id, by = %user.email, "action deleted");

    Ok(flash::redirect(jar, Flash::success("Action deleted."), "/actions").into_response())
}
