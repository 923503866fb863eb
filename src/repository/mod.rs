use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::StoreResult,
    models::{
        Action, ActionForm, Entity, EntityForm, Event, EventForm, EventListItem, ListFilter,
        NewUser, Person, PersonForm, User,
    },
};

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use rest::RestRepository;

/// Repository Trait
///
/// The contract for every persistence operation. Handlers only ever see
/// `Arc<dyn Repository>`, so the hosted REST store, a direct Postgres pool and
/// the in-memory store used by tests are interchangeable.
///
/// Every write is a whole-row replace of the submitted fields; there is no
/// versioning, and the last write wins. Updates and deletes report whether a row
/// with that id existed.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    // Overwrites the stored hash for `email`. Returns false when no such user exists.
    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool>;

    // --- Entities ---
    // Filters on `q` (name contains, case-insensitive); newest first.
    async fn list_entities(&self, filter: &ListFilter) -> StoreResult<Vec<Entity>>;
    async fn get_entity(&self, id: i64) -> StoreResult<Option<Entity>>;
    async fn create_entity(&self, form: EntityForm) -> StoreResult<Entity>;
    async fn update_entity(&self, id: i64, form: EntityForm) -> StoreResult<Option<Entity>>;
    // Never cascades: rows that reference the entity keep their entity_id.
    async fn delete_entity(&self, id: i64) -> StoreResult<bool>;

    // --- Persons ---
    // Filters on `entity_id` and `q` (name contains); newest first.
    async fn list_persons(&self, filter: &ListFilter) -> StoreResult<Vec<Person>>;
    async fn get_person(&self, id: i64) -> StoreResult<Option<Person>>;
    async fn create_person(&self, form: PersonForm) -> StoreResult<Person>;
    async fn update_person(&self, id: i64, form: PersonForm) -> StoreResult<Option<Person>>;
    async fn delete_person(&self, id: i64) -> StoreResult<bool>;

    // --- Events ---
    // Filters on `entity_id` and `q` (the joined entity's name contains), evaluated
    // by the store as part of the query; latest date first.
    async fn list_events(&self, filter: &ListFilter) -> StoreResult<Vec<EventListItem>>;
    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>>;
    async fn create_event(&self, form: EventForm) -> StoreResult<Event>;
    async fn update_event(&self, id: i64, form: EventForm) -> StoreResult<Option<Event>>;
    async fn delete_event(&self, id: i64) -> StoreResult<bool>;

    // --- Actions ---
    // Filters on `entity_id` and `q` (title contains); latest due date first.
    async fn list_actions(&self, filter: &ListFilter) -> StoreResult<Vec<Action>>;
    async fn get_action(&self, id: i64) -> StoreResult<Option<Action>>;
    async fn create_action(&self, form: ActionForm) -> StoreResult<Action>;
    async fn update_action(&self, id: i64, form: ActionForm) -> StoreResult<Option<Action>>;
    async fn delete_action(&self, id: i64) -> StoreResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Escapes LIKE wildcards so a search term only ever matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
