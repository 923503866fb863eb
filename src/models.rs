use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::auth::Role;

// --- Core Records (Mapped to Store Tables) ---

/// User
///
/// A login account from the `users` table. The hash is loaded for credential
/// checks only and is never serialized back out.
#[derive(Debug, Clone, Deserialize, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Entity
///
/// An organisation from the `entities` table. Persons, events and actions all
/// reference one by `entity_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub address: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Person
///
/// A contact belonging to one entity (`persons` table).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub position: String,
    pub entity_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Event
///
/// Something that happened with an entity, optionally involving one of its
/// persons (`events` table). Dates travel as `YYYY-MM-DD` strings, exactly as the
/// date input submits them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub description: String,
    pub date: Option<String>,

    // 'type' is a reserved keyword in Rust.
    #[serde(rename = "type", default, deserialize_with = "nullable_text")]
    #[sqlx(rename = "type")]
    pub event_type: String,

    pub entity_id: i64,
    pub person_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Action
///
/// A follow-up task against an entity (`actions` table).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Action {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub priority: String,
    pub due_date: Option<String>,
    pub entity_id: i64,
    pub created_at: DateTime<Utc>,
}

// --- Joined / Aggregated Views ---

/// EventListItem
///
/// An event together with the names of the rows it references. Both names are
/// optional: a deleted entity or person leaves a dangling id behind.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct EventListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub event: Event,
    pub entity_name: Option<String>,
    pub person_name: Option<String>,
}

/// EntityDetail
///
/// One entity with every event and action pointing at it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntityDetail {
    pub entity: Entity,
    pub events: Vec<EventListItem>,
    pub actions: Vec<Action>,
}

/// UserProfile
///
/// Public view of an account; what the JSON API returns instead of `User`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

// --- Write Payloads (Form Input, forwarded verbatim to the store) ---

/// NewUser
///
/// Insert payload for `users`. Only ever built with an already hashed password.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EntityForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub position: String,
    pub entity_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub entity_id: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub person_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActionForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub due_date: Option<String>,
    pub entity_id: i64,
}

impl From<&Entity> for EntityForm {
    fn from(entity: &Entity) -> Self {
        Self {
            name: entity.name.clone(),
            description: entity.description.clone(),
            address: entity.address.clone(),
            phone: entity.phone.clone(),
            email: entity.email.clone(),
            url: entity.url.clone(),
        }
    }
}

impl From<&Person> for PersonForm {
    fn from(person: &Person) -> Self {
        Self {
            name: person.name.clone(),
            email: person.email.clone(),
            phone: person.phone.clone(),
            position: person.position.clone(),
            entity_id: person.entity_id,
        }
    }
}

impl From<&Event> for EventForm {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.clone(),
            event_type: event.event_type.clone(),
            entity_id: event.entity_id,
            person_id: event.person_id,
        }
    }
}

impl From<&Action> for ActionForm {
    fn from(action: &Action) -> Self {
        Self {
            title: action.title.clone(),
            description: action.description.clone(),
            status: action.status.clone(),
            priority: action.priority.clone(),
            due_date: action.due_date.clone(),
            entity_id: action.entity_id,
        }
    }
}

// --- Auth Forms ---

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// NewUserRequest
///
/// JSON body of `POST /api/users`. The password arrives in clear and is hashed
/// before it reaches the store.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub new_password: String,
}

// --- List Filters ---

/// ListFilter
///
/// Query parameters shared by every list view. `entity_id` is an equality
/// predicate on the owning entity; `q` is a case-insensitive substring match on
/// the resource's searchable text field. Blank values mean "no filter".
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    /// Only rows belonging to this entity.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub entity_id: Option<i64>,
    /// Case-insensitive substring search.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
}

impl ListFilter {
    pub fn for_entity(entity_id: i64) -> Self {
        Self {
            entity_id: Some(entity_id),
            q: None,
        }
    }

    pub fn search(q: impl Into<String>) -> Self {
        Self {
            entity_id: None,
            q: Some(q.into()),
        }
    }
}

// --- Serde Helpers ---

/// Treats a missing, empty or whitespace-only value as `None`. HTML forms submit
/// unset selects and date inputs as empty strings.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Reads a nullable text column as an empty string.
fn nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
