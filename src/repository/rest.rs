use async_trait::async_trait;
use reqwest::{
    Response, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Display;

use super::Repository;
use crate::{
    error::{StoreError, StoreResult},
    models::{
        Action, ActionForm, Entity, EntityForm, Event, EventForm, EventListItem, ListFilter,
        NewUser, Person, PersonForm, User,
    },
};

const USER_COLUMNS: &str = "id,name,email,password_hash";

/// Read-only view of `events` with `entity_name` and `person_name` joined on.
const EVENT_LIST_VIEW: &str = "event_list";

/// RestQuery
///
/// Builds the query string of a PostgREST table request: column selection,
/// `eq`/`imatch` filters and ordering. Pure data, so it can be asserted on without
/// a server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestQuery {
    params: Vec<(String, String)>,
}

impl RestQuery {
    pub fn select(columns: &str) -> Self {
        Self {
            params: vec![("select".to_string(), columns.to_string())],
        }
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Case-insensitive literal "contains". PostgREST rewrites every `*` in an
    /// `ilike` pattern to `%`, so the match goes through `imatch` with the term
    /// escaped as a regex instead.
    pub fn icontains(mut self, column: &str, term: &str) -> Self {
        self.params
            .push((column.to_string(), format!("imatch.{}", regex_literal(term))));
        self
    }

    pub fn order(mut self, ordering: &str) -> Self {
        self.params.push(("order".to_string(), ordering.to_string()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// RestRepository
///
/// `Repository` over the hosted table API (Supabase's PostgREST endpoint at
/// `{url}/rest/v1`). Every method is exactly one HTTP round-trip; the project key
/// goes out as both `apikey` and bearer token on every request.
#[derive(Clone)]
pub struct RestRepository {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct PasswordPatch<'a> {
    password_hash: &'a str,
}

impl RestRepository {
    pub fn new(url: &str, key: &str) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(key)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// Turns a non-2xx answer into a `StoreError`. 409 is a unique constraint
    /// violation; everything else is `Remote`, with the body kept for the log.
    async fn checked(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict(body));
        }
        tracing::error!(status = status.as_u16(), %body, "store request rejected");
        Err(StoreError::Remote {
            status: status.as_u16(),
            body,
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RestQuery,
    ) -> StoreResult<Vec<T>> {
        let response = self
            .client
            .get(self.table_url(table))
            .query(query.params())
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn select_by_id<T: DeserializeOwned>(
        &self,
        table: &str,
        id: i64,
    ) -> StoreResult<Option<T>> {
        let query = RestQuery::select("*").eq("id", id).limit(1);
        Ok(self.select(table, &query).await?.into_iter().next())
    }

    async fn insert<B, T>(&self, table: &'static str, body: &B) -> StoreResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = Self::checked(response).await?.json().await?;
        rows.into_iter().next().ok_or(StoreError::EmptyResponse(table))
    }

    /// PATCH every row matching `query` and return the updated rows.
    async fn update_where<B, T>(
        &self,
        table: &str,
        query: &RestQuery,
        body: &B,
    ) -> StoreResult<Vec<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .patch(self.table_url(table))
            .query(query.params())
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn update_by_id<B, T>(&self, table: &str, id: i64, body: &B) -> StoreResult<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let query = RestQuery::default().eq("id", id);
        Ok(self.update_where(table, &query, body).await?.into_iter().next())
    }

    async fn delete_by_id(&self, table: &str, id: i64) -> StoreResult<bool> {
        let query = RestQuery::default().eq("id", id);
        let response = self
            .client
            .delete(self.table_url(table))
            .query(query.params())
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let deleted: Vec<serde_json::Value> = Self::checked(response).await?.json().await?;
        Ok(!deleted.is_empty())
    }
}

/// Filter + order for persons/actions style lists: `entity_id` equality and a
/// contains match on `search_column`.
fn list_query(filter: &ListFilter, search_column: &str, order: &str) -> RestQuery {
    let mut query = RestQuery::select("*");
    if let Some(entity_id) = filter.entity_id {
        query = query.eq("entity_id", entity_id);
    }
    if let Some(q) = &filter.q {
        query = query.icontains(search_column, q);
    }
    query.order(order)
}

/// Escapes `term` so a POSIX regex matches it literally.
fn regex_literal(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if r"\.^$|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The `event_list` view query. The view left-joins entity and person names
/// onto each event, so dangling rows survive; a name search never matches a
/// NULL `entity_name`, which drops them exactly like an inner join.
pub fn events_query(filter: &ListFilter) -> RestQuery {
    let mut query = RestQuery::select("*");
    if let Some(entity_id) = filter.entity_id {
        query = query.eq("entity_id", entity_id);
    }
    if let Some(q) = &filter.q {
        query = query.icontains("entity_name", q);
    }
    query.order("date.desc.nullslast,id.desc")
}

#[async_trait]
impl Repository for RestRepository {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = RestQuery::select(USER_COLUMNS).eq("email", email).limit(1);
        Ok(self.select("users", &query).await?.into_iter().next())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let query = RestQuery::select(USER_COLUMNS).order("name.asc");
        self.select("users", &query).await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.insert("users", &user).await
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool> {
        let query = RestQuery::default().eq("email", email);
        let updated: Vec<serde_json::Value> = self
            .update_where("users", &query, &PasswordPatch { password_hash })
            .await?;
        Ok(!updated.is_empty())
    }

    // --- Entities ---

    async fn list_entities(&self, filter: &ListFilter) -> StoreResult<Vec<Entity>> {
        let mut query = RestQuery::select("*");
        if let Some(q) = &filter.q {
            query = query.icontains("name", q);
        }
        self.select("entities", &query.order("created_at.desc,id.desc"))
            .await
    }

    async fn get_entity(&self, id: i64) -> StoreResult<Option<Entity>> {
        self.select_by_id("entities", id).await
    }

    async fn create_entity(&self, form: EntityForm) -> StoreResult<Entity> {
        self.insert("entities", &form).await
    }

    async fn update_entity(&self, id: i64, form: EntityForm) -> StoreResult<Option<Entity>> {
        self.update_by_id("entities", id, &form).await
    }

    async fn delete_entity(&self, id: i64) -> StoreResult<bool> {
        self.delete_by_id("entities", id).await
    }

    // --- Persons ---

    async fn list_persons(&self, filter: &ListFilter) -> StoreResult<Vec<Person>> {
        let query = list_query(filter, "name", "created_at.desc,id.desc");
        self.select("persons", &query).await
    }

    async fn get_person(&self, id: i64) -> StoreResult<Option<Person>> {
        self.select_by_id("persons", id).await
    }

    async fn create_person(&self, form: PersonForm) -> StoreResult<Person> {
        self.insert("persons", &form).await
    }

    async fn update_person(&self, id: i64, form: PersonForm) -> StoreResult<Option<Person>> {
        self.update_by_id("persons", id, &form).await
    }

    async fn delete_person(&self, id: i64) -> StoreResult<bool> {
        self.delete_by_id("persons", id).await
    }

    // --- Events ---

    async fn list_events(&self, filter: &ListFilter) -> StoreResult<Vec<EventListItem>> {
        self.select(EVENT_LIST_VIEW, &events_query(filter)).await
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        self.select_by_id("events", id).await
    }

    async fn create_event(&self, form: EventForm) -> StoreResult<Event> {
        self.insert("events", &form).await
    }

    async fn update_event(&self, id: i64, form: EventForm) -> StoreResult<Option<Event>> {
        self.update_by_id("events", id, &form).await
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        self.delete_by_id("events", id).await
    }

    // --- Actions ---

    async fn list_actions(&self, filter: &ListFilter) -> StoreResult<Vec<Action>> {
        let query = list_query(filter, "title", "due_date.desc.nullslast,id.desc");
        self.select("actions", &query).await
    }

    async fn get_action(&self, id: i64) -> StoreResult<Option<Action>> {
        self.select_by_id("actions", id).await
    }

    async fn create_action(&self, form: ActionForm) -> StoreResult<Action> {
        self.insert("actions", &form).await
    }

    async fn update_action(&self, id: i64, form: ActionForm) -> StoreResult<Option<Action>> {
        self.update_by_id("actions", id, &form).await
    }

    async fn delete_action(&self, id: i64) -> StoreResult<bool> {
        self.delete_by_id("actions", id).await
    }
}
