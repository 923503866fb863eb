use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};

use super::{Repository, escape_like};
use crate::{
    error::{StoreError, StoreResult},
    models::{
        Action, ActionForm, Entity, EntityForm, Event, EventForm, EventListItem, ListFilter,
        NewUser, Person, PersonForm, User,
    },
};

// Select lists. Nullable text reads back as '', dates as ISO strings.
const USER_COLUMNS: &str = "id, name, email, password_hash";

const ENTITY_COLUMNS: &str = "id, name, COALESCE(description, '') AS description, \
     COALESCE(address, '') AS address, COALESCE(phone, '') AS phone, \
     COALESCE(email, '') AS email, COALESCE(url, '') AS url, created_at";

const PERSON_COLUMNS: &str = "id, name, COALESCE(email, '') AS email, \
     COALESCE(phone, '') AS phone, COALESCE(position, '') AS position, entity_id, created_at";

const EVENT_COLUMNS: &str = "id, title, COALESCE(description, '') AS description, \
     to_char(date, 'YYYY-MM-DD') AS date, COALESCE(\"type\", '') AS \"type\", \
     entity_id, person_id, created_at";

const EVENT_LIST_COLUMNS: &str = "ev.id, ev.title, COALESCE(ev.description, '') AS description, \
     to_char(ev.date, 'YYYY-MM-DD') AS date, COALESCE(ev.\"type\", '') AS \"type\", \
     ev.entity_id, ev.person_id, ev.created_at, en.name AS entity_name, p.name AS person_name";

const ACTION_COLUMNS: &str = "id, title, COALESCE(description, '') AS description, \
     COALESCE(status, '') AS status, COALESCE(priority, '') AS priority, \
     to_char(due_date, 'YYYY-MM-DD') AS due_date, entity_id, created_at";

/// PostgresRepository
///
/// `Repository` over a direct connection to the same five tables the REST store
/// exposes (see `migrations/`). Filtering uses `QueryBuilder` with bound
/// parameters only.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// Unique violations become `Conflict`; everything else stays a database error.
fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Entities ---

    async fn list_entities(&self, filter: &ListFilter) -> StoreResult<Vec<Entity>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE TRUE"));

        if let Some(q) = &filter.q {
            builder.push(" AND name ILIKE ").push_bind(contains_pattern(q));
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        Ok(builder
            .build_query_as::<Entity>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_entity(&self, id: i64) -> StoreResult<Option<Entity>> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = $1");
        Ok(sqlx::query_as::<_, Entity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_entity(&self, form: EntityForm) -> StoreResult<Entity> {
        let sql = format!(
            "INSERT INTO entities (name, description, address, phone, email, url) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ENTITY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Entity>(&sql)
            .bind(form.name)
            .bind(form.description)
            .bind(form.address)
            .bind(form.phone)
            .bind(form.email)
            .bind(form.url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_entity(&self, id: i64, form: EntityForm) -> StoreResult<Option<Entity>> {
        let sql = format!(
            "UPDATE entities SET name = $2, description = $3, address = $4, phone = $5, \
             email = $6, url = $7 WHERE id = $1 RETURNING {ENTITY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Entity>(&sql)
            .bind(id)
            .bind(form.name)
            .bind(form.description)
            .bind(form.address)
            .bind(form.phone)
            .bind(form.email)
            .bind(form.url)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_entity(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM entities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Persons ---

    async fn list_persons(&self, filter: &ListFilter) -> StoreResult<Vec<Person>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PERSON_COLUMNS} FROM persons WHERE TRUE"));

        if let Some(entity_id) = filter.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(q) = &filter.q {
            builder.push(" AND name ILIKE ").push_bind(contains_pattern(q));
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        Ok(builder
            .build_query_as::<Person>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_person(&self, id: i64) -> StoreResult<Option<Person>> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = $1");
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_person(&self, form: PersonForm) -> StoreResult<Person> {
        let sql = format!(
            "INSERT INTO persons (name, email, phone, position, entity_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PERSON_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(form.name)
            .bind(form.email)
            .bind(form.phone)
            .bind(form.position)
            .bind(form.entity_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_person(&self, id: i64, form: PersonForm) -> StoreResult<Option<Person>> {
        let sql = format!(
            "UPDATE persons SET name = $2, email = $3, phone = $4, position = $5, \
             entity_id = $6 WHERE id = $1 RETURNING {PERSON_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .bind(form.name)
            .bind(form.email)
            .bind(form.phone)
            .bind(form.position)
            .bind(form.entity_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_person(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM persons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Events ---

    /// The entity-name search is part of the query: an inner join on `entities`
    /// with an ILIKE predicate. Without a search the join is LEFT so events whose
    /// entity was deleted still list.
    async fn list_events(&self, filter: &ListFilter) -> StoreResult<Vec<EventListItem>> {
        let entity_join = if filter.q.is_some() { "JOIN" } else { "LEFT JOIN" };
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {EVENT_LIST_COLUMNS} FROM events ev \
             {entity_join} entities en ON en.id = ev.entity_id \
             LEFT JOIN persons p ON p.id = ev.person_id WHERE TRUE"
        ));

        if let Some(entity_id) = filter.entity_id {
            builder.push(" AND ev.entity_id = ").push_bind(entity_id);
        }
        if let Some(q) = &filter.q {
            builder.push(" AND en.name ILIKE ").push_bind(contains_pattern(q));
        }
        builder.push(" ORDER BY ev.date DESC NULLS LAST, ev.id DESC");

        Ok(builder
            .build_query_as::<EventListItem>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_event(&self, form: EventForm) -> StoreResult<Event> {
        let sql = format!(
            "INSERT INTO events (title, description, date, \"type\", entity_id, person_id) \
             VALUES ($1, $2, $3::date, $4, $5, $6) RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(form.title)
            .bind(form.description)
            .bind(form.date)
            .bind(form.event_type)
            .bind(form.entity_id)
            .bind(form.person_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_event(&self, id: i64, form: EventForm) -> StoreResult<Option<Event>> {
        let sql = format!(
            "UPDATE events SET title = $2, description = $3, date = $4::date, \"type\" = $5, \
             entity_id = $6, person_id = $7 WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(form.title)
            .bind(form.description)
            .bind(form.date)
            .bind(form.event_type)
            .bind(form.entity_id)
            .bind(form.person_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Actions ---

    async fn list_actions(&self, filter: &ListFilter) -> StoreResult<Vec<Action>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ACTION_COLUMNS} FROM actions WHERE TRUE"));

        if let Some(entity_id) = filter.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(q) = &filter.q {
            builder.push(" AND title ILIKE ").push_bind(contains_pattern(q));
        }
        builder.push(" ORDER BY due_date DESC NULLS LAST, id DESC");

        Ok(builder
            .build_query_as::<Action>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_action(&self, id: i64) -> StoreResult<Option<Action>> {
        let sql = format!("SELECT {ACTION_COLUMNS} FROM actions WHERE id = $1");
        Ok(sqlx::query_as::<_, Action>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_action(&self, form: ActionForm) -> StoreResult<Action> {
        let sql = format!(
            "INSERT INTO actions (title, description, status, priority, due_date, entity_id) \
             VALUES ($1, $2, $3, $4, $5::date, $6) RETURNING {ACTION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Action>(&sql)
            .bind(form.title)
            .bind(form.description)
            .bind(form.status)
            .bind(form.priority)
            .bind(form.due_date)
            .bind(form.entity_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_action(&self, id: i64, form: ActionForm) -> StoreResult<Option<Action>> {
        let sql = format!(
            "UPDATE actions SET title = $2, description = $3, status = $4, priority = $5, \
             due_date = $6::date, entity_id = $7 WHERE id = $1 RETURNING {ACTION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Action>(&sql)
            .bind(id)
            .bind(form.title)
            .bind(form.description)
            .bind(form.status)
            .bind(form.priority)
            .bind(form.due_date)
            .bind(form.entity_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_action(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM actions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
