use async_trait::async_trait;
use chrono::Utc;
use std::cmp::{Ordering, Reverse};
use tokio::sync::RwLock;

use super::Repository;
use crate::{
    error::{StoreError, StoreResult},
    models::{
        Action, ActionForm, Entity, EntityForm, Event, EventForm, EventListItem, ListFilter,
        NewUser, Person, PersonForm, User,
    },
};

/// MemoryRepository
///
/// An in-process implementation of `Repository` with the same observable
/// semantics as the hosted store: identity ids, store-side `created_at`, unique
/// user emails, foreign keys checked on write and never cascaded on delete.
/// Backs the integration tests.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    entities: Vec<Entity>,
    persons: Vec<Person>,
    events: Vec<Event>,
    actions: Vec<Action>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_entity(&self, id: i64) -> StoreResult<()> {
        if self.entities.iter().any(|e| e.id == id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference {
                table: "entities",
                id,
            })
        }
    }

    fn require_person(&self, id: Option<i64>) -> StoreResult<()> {
        match id {
            Some(id) if !self.persons.iter().any(|p| p.id == id) => {
                Err(StoreError::MissingReference { table: "persons", id })
            }
            _ => Ok(()),
        }
    }

    fn entity_name(&self, id: i64) -> Option<String> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.clone())
    }

    fn person_name(&self, id: Option<i64>) -> Option<String> {
        let id = id?;
        self.persons
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

// ISO dates order correctly as strings.
fn desc_nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn matches_entity(entity_id: i64, filter: &ListFilter) -> bool {
    filter.entity_id.is_none_or(|wanted| wanted == entity_id)
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "users.email {} already exists",
                user.email
            )));
        }
        let row = User {
            id: tables.next_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Entities ---

    async fn list_entities(&self, filter: &ListFilter) -> StoreResult<Vec<Entity>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Entity> = tables
            .entities
            .iter()
            .filter(|e| contains_ci(&e.name, &filter.q))
            .cloned()
            .collect();
        rows.sort_by_key(|e| Reverse((e.created_at, e.id)));
        Ok(rows)
    }

    async fn get_entity(&self, id: i64) -> StoreResult<Option<Entity>> {
        let tables = self.tables.read().await;
        Ok(tables.entities.iter().find(|e| e.id == id).cloned())
    }

    async fn create_entity(&self, form: EntityForm) -> StoreResult<Entity> {
        let mut tables = self.tables.write().await;
        let row = Entity {
            id: tables.next_id(),
            name: form.name,
            description: form.description,
            address: form.address,
            phone: form.phone,
            email: form.email,
            url: form.url,
            created_at: Utc::now(),
        };
        tables.entities.push(row.clone());
        Ok(row)
    }

    async fn update_entity(&self, id: i64, form: EntityForm) -> StoreResult<Option<Entity>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.entities.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        row.name = form.name;
        row.description = form.description;
        row.address = form.address;
        row.phone = form.phone;
        row.email = form.email;
        row.url = form.url;
        Ok(Some(row.clone()))
    }

    async fn delete_entity(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.entities.len();
        tables.entities.retain(|e| e.id != id);
        Ok(tables.entities.len() < before)
    }

    // --- Persons ---

    async fn list_persons(&self, filter: &ListFilter) -> StoreResult<Vec<Person>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Person> = tables
            .persons
            .iter()
            .filter(|p| matches_entity(p.entity_id, filter) && contains_ci(&p.name, &filter.q))
            .cloned()
            .collect();
        rows.sort_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(rows)
    }

    async fn get_person(&self, id: i64) -> StoreResult<Option<Person>> {
        let tables = self.tables.read().await;
        Ok(tables.persons.iter().find(|p| p.id == id).cloned())
    }

    async fn create_person(&self, form: PersonForm) -> StoreResult<Person> {
        let mut tables = self.tables.write().await;
        tables.require_entity(form.entity_id)?;
        let row = Person {
            id: tables.next_id(),
            name: form.name,
            email: form.email,
            phone: form.phone,
            position: form.position,
            entity_id: form.entity_id,
            created_at: Utc::now(),
        };
        tables.persons.push(row.clone());
        Ok(row)
    }

    async fn update_person(&self, id: i64, form: PersonForm) -> StoreResult<Option<Person>> {
        let mut tables = self.tables.write().await;
        tables.require_entity(form.entity_id)?;
        let Some(row) = tables.persons.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.name = form.name;
        row.email = form.email;
        row.phone = form.phone;
        row.position = form.position;
        row.entity_id = form.entity_id;
        Ok(Some(row.clone()))
    }

    async fn delete_person(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.persons.len();
        tables.persons.retain(|p| p.id != id);
        Ok(tables.persons.len() < before)
    }

    // --- Events ---

    async fn list_events(&self, filter: &ListFilter) -> StoreResult<Vec<EventListItem>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<EventListItem> = tables
            .events
            .iter()
            .filter(|e| matches_entity(e.entity_id, filter))
            .filter_map(|event| {
                let entity_name = tables.entity_name(event.entity_id);
                // Searching joins on the entity, so dangling events drop out.
                if filter.q.is_some()
                    && !entity_name
                        .as_deref()
                        .is_some_and(|name| contains_ci(name, &filter.q))
                {
                    return None;
                }
                Some(EventListItem {
                    event: event.clone(),
                    entity_name,
                    person_name: tables.person_name(event.person_id),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            desc_nulls_last(&a.event.date, &b.event.date).then(b.event.id.cmp(&a.event.id))
        });
        Ok(rows)
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        let tables = self.tables.read().await;
        Ok(tables.events.iter().find(|e| e.id == id).cloned())
    }

    async fn create_event(&self, form: EventForm) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        tables.require_entity(form.entity_id)?;
        tables.require_person(form.person_id)?;
        let row = Event {
            id: tables.next_id(),
            title: form.title,
            description: form.description,
            date: form.date,
            event_type: form.event_type,
            entity_id: form.entity_id,
            person_id: form.person_id,
            created_at: Utc::now(),
        };
        tables.events.push(row.clone());
        Ok(row)
    }

    async fn update_event(&self, id: i64, form: EventForm) -> StoreResult<Option<Event>> {
        let mut tables = self.tables.write().await;
        tables.require_entity(form.entity_id)?;
        tables.require_person(form.person_id)?;
        let Some(row) = tables.events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        row.title = form.title;
        row.description = form.description;
        row.date = form.date;
        row.event_type = form.event_type;
        row.entity_id = form.entity_id;
        row.person_id = form.person_id;
        Ok(Some(row.clone()))
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.events.len();
        tables.events.retain(|e| e.id != id);
        Ok(tables.events.len() < before)
    }

    // --- Actions ---

    async fn list_actions(&self, filter: &ListFilter) -> StoreResult<Vec<Action>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Action> = tables
            .actions
            .iter()
            .filter(|a| matches_entity(a.entity_id, filter) && contains_ci(&a.title, &filter.q))
            .cloned()
            .collect();
        rows.sort_by(|a, b| desc_nulls_last(&a.due_date, &b.due_date).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn get_action(&self, id: i64) -> StoreResult<Option<Action>> {
        let tables = self.tables.read().await;
        Ok(tables.actions.iter().find(|a| a.id == id).cloned())
    }

    async fn create_action(&self, form: ActionForm) -> StoreResult<Action> {
        let mut tables = self.tables.write().await;
        tables.require_entity(form.entity_id)?;
        let row = Action {
            id: tables.next_id(),
            title: form.title,
            description: form.description,
            status: form.status,
            priority: form.priority,
            due_date: form.due_date,
            entity_id: form.entity_id,
            created_at: Utc::now(),
        };
        tables.actions.push(row.clone());
        Ok(row)
    }

    async fn update_action(&self, id: i64, form: ActionForm) -> StoreResult<Option<Action>> {
        let mut tables = self.tables.write().await;
        tables.require_entity(form.entity_id)?;
        let Some(row) = tables.actions.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        row.title = form.title;
        row.description = form.description;
        row.status = form.status;
        row.priority = form.priority;
        row.due_date = form.due_date;
        row.entity_id = form.entity_id;
        Ok(Some(row.clone()))
    }

    async fn delete_action(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.actions.len();
        tables.actions.retain(|a| a.id != id);
        Ok(tables.actions.len() < before)
    }
}
