use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppConfig, AppState,
    auth::{ApiUser, Role},
    error::{AppError, StoreError},
    models::{
        Action, Entity, EntityDetail, EventListItem, ListFilter, NewUser, NewUserRequest, Person,
        User, UserProfile,
    },
    password,
};

fn profile(config: &AppConfig, row: User) -> UserProfile {
    UserProfile {
        role: if config.is_admin(&row.email) {
            Role::Admin
        } else {
            Role::Member
        },
        id: row.id,
        name: row.name,
        email: row.email,
    }
}

// --- Handlers ---

/// get_me
///
/// [Authenticated Route] The profile behind the current session cookie.
/// A session whose user row has since been removed reads as unauthenticated.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let Some(row) = state.repo.find_user_by_email(&user.email).await? else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };

    Ok(Json(UserProfile {
        id: row.id,
        name: row.name,
        email: row.email,
        role: user.role,
    })
    .into_response())
}

/// list_users
///
/// [Admin Route] Every account, sorted by name. Password hashes never leave
/// the store layer.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let users: Vec<UserProfile> = state
        .repo
        .list_users()
        .await?
        .into_iter()
        .map(|row| profile(&state.config, row))
        .collect();

    Ok(Json(users).into_response())
}

/// create_user
///
/// [Admin Route] JSON counterpart of the registration form. Blank fields are a
/// 400; an email that already has an account is a 409, whether caught here or
/// by the store's unique constraint.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUserRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Name, email or password missing"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Json(body): Json<NewUserRequest>,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    let email = body.email.trim();
    if body.name.trim().is_empty() || email.is_empty() || body.password.is_empty() {
        return Ok(StatusCode::BAD_REQUEST.into_response());
    }
    if state.repo.find_user_by_email(email).await?.is_some() {
        return Ok(StatusCode::CONFLICT.into_response());
    }

    let password_hash =
        password::hash_password(&body.password, state.config.password_cost).await?;
    let new_user = NewUser {
        name: body.name.trim().to_string(),
        email: email.to_string(),
        password_hash,
    };

    match state.repo.create_user(new_user).await {
        Ok(row) => {
            tracing::info!(email = %row.email, by = %user.email, "user created via api");
            Ok((StatusCode::CREATED, Json(profile(&state.config, row))).into_response())
        }
        Err(StoreError::Conflict(_)) => Ok(StatusCode::CONFLICT.into_response()),
        Err(e) => Err(e.into()),
    }
}

/// list_entities
///
/// [Authenticated Route] Entities, newest first, with the same `q` search as the HTML list.
#[utoipa::path(
    get,
    path = "/api/entities",
    params(ListFilter),
    responses((status = 200, description = "Entities", body = [Entity]))
)]
pub async fn list_entities(
    _user: ApiUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Entity>>, AppError> {
    Ok(Json(state.repo.list_entities(&filter).await?))
}

/// get_entity
///
/// [Authenticated Route] One entity with its events and actions.
#[utoipa::path(
    get,
    path = "/api/entities/{id}",
    params(("id" = i64, Path, description = "Entity id")),
    responses(
        (status = 200, description = "Entity with related rows", body = EntityDetail),
        (status = 404, description = "No such entity")
    )
)]
pub async fn get_entity(
    _user: ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let related = ListFilter::for_entity(id);
    let (entity, events, actions) = tokio::try_join!(
        state.repo.get_entity(id),
        state.repo.list_events(&related),
        state.repo.list_actions(&related),
    )?;

    match entity {
        Some(entity) => Ok(Json(EntityDetail {
            entity,
            events,
            actions,
        })
        .into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// list_persons
///
/// [Authenticated Route] Persons, filterable by `entity_id` and name.
#[utoipa::path(
    get,
    path = "/api/persons",
    params(ListFilter),
    responses((status = 200, description = "Persons", body = [Person]))
)]
pub async fn list_persons(
    _user: ApiUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Person>>, AppError> {
    Ok(Json(state.repo.list_persons(&filter).await?))
}

/// list_events
///
/// [Authenticated Route] Events with entity and person names; `q` searches the entity name.
#[utoipa::path(
    get,
    path = "/api/events",
    params(ListFilter),
    responses((status = 200, description = "Events", body = [EventListItem]))
)]
pub async fn list_events(
    _user: ApiUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<EventListItem>>, AppError> {
    Ok(Json(state.repo.list_events(&filter).await?))
}

/// list_actions
///
/// [Authenticated Route] Actions, filterable by `entity_id` and title.
#[utoipa::path(
    get,
    path = "/api/actions",
    params(ListFilter),
    responses((status = 200, description = "Actions", body = [Action]))
)]
pub async fn list_actions(
    _user: ApiUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Action>>, AppError> {
    Ok(Json(state.repo.list_actions(&filter).await?))
}
