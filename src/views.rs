use askama::Template;
use axum::response::Html;
use axum_extra::extract::cookie::CookieJar;

use crate::{
    auth::AuthUser,
    error::AppError,
    flash::{self, Flash},
    models::{
        Action, ActionForm, Entity, EntityForm, EventForm, EventListItem, ListFilter, Person,
        PersonForm,
    },
};

pub const EVENT_TYPES: &[&str] = &["meeting", "call", "email", "visit", "other"];
pub const ACTION_STATUSES: &[&str] = &["open", "in progress", "done"];
pub const ACTION_PRIORITIES: &[&str] = &["low", "medium", "high"];

/// Layout
///
/// What `base.html` needs on every page: the signed-in user for the navigation
/// bar and the pending flash message, if any.
pub struct Layout {
    pub user: Option<AuthUser>,
    pub flash: Option<Flash>,
}

impl Layout {
    /// Consumes the pending flash from `jar`. The returned jar must be part of the
    /// response so the flash cookie is cleared.
    pub fn take(jar: CookieJar, user: Option<AuthUser>) -> (CookieJar, Self) {
        let (jar, flash) = flash::take(jar);
        (jar, Self { user, flash })
    }

    /// A layout that shows `flash` directly, for forms redisplayed in the same
    /// response.
    pub fn with_flash(user: Option<AuthUser>, flash: Flash) -> Self {
        Self {
            user,
            flash: Some(flash),
        }
    }
}

/// One `<option>` of a select box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Options for picking an entity, sorted by name.
pub fn entity_options(entities: &[Entity], selected: Option<i64>) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = entities
        .iter()
        .map(|e| SelectOption {
            value: e.id.to_string(),
            label: e.name.clone(),
            selected: selected == Some(e.id),
        })
        .collect();
    options.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
    options
}

pub fn person_options(persons: &[Person], selected: Option<i64>) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = persons
        .iter()
        .map(|p| SelectOption {
            value: p.id.to_string(),
            label: p.name.clone(),
            selected: selected == Some(p.id),
        })
        .collect();
    options.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
    options
}

/// Options for a fixed vocabulary. A stored value outside the vocabulary is kept
/// as an extra option so editing a row never silently changes it.
pub fn choice_options(choices: &[&str], current: &str) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = choices
        .iter()
        .map(|choice| SelectOption {
            value: choice.to_string(),
            label: choice.to_string(),
            selected: *choice == current,
        })
        .collect();
    if !current.is_empty() && !choices.contains(&current) {
        options.push(SelectOption {
            value: current.to_string(),
            label: current.to_string(),
            selected: true,
        });
    }
    options
}

pub fn render(page: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}

// --- Auth Pages ---

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub layout: Layout,
    pub email: String,
}

#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomePage {
    pub layout: Layout,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub layout: Layout,
    pub name: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "change_password.html")]
pub struct ChangePasswordPage {
    pub layout: Layout,
}

// --- Entities ---

#[derive(Template)]
#[template(path = "entities/list.html")]
pub struct EntityListPage {
    pub layout: Layout,
    pub entities: Vec<Entity>,
    pub q: String,
}

#[derive(Template)]
#[template(path = "entities/form.html")]
pub struct EntityFormPage {
    pub layout: Layout,
    pub heading: String,
    pub submit_to: String,
    pub form: EntityForm,
}

#[derive(Template)]
#[template(path = "entities/detail.html")]
pub struct EntityDetailPage {
    pub layout: Layout,
    pub entity: Entity,
    pub events: Vec<EventListItem>,
    pub actions: Vec<Action>,
}

// --- Persons ---

/// A person with the name of the entity it belongs to, when that entity still exists.
pub struct PersonRow {
    pub person: Person,
    pub entity_name: Option<String>,
}

#[derive(Template)]
#[template(path = "persons/list.html")]
pub struct PersonListPage {
    pub layout: Layout,
    pub persons: Vec<PersonRow>,
    pub q: String,
    pub entity_options: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "persons/form.html")]
pub struct PersonFormPage {
    pub layout: Layout,
    pub heading: String,
    pub submit_to: String,
    pub form: PersonForm,
    pub entity_options: Vec<SelectOption>,
}

// --- Events ---

#[derive(Template)]
#[template(path = "events/list.html")]
pub struct EventListPage {
    pub layout: Layout,
    pub events: Vec<EventListItem>,
    pub q: String,
    pub entity_options: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "events/form.html")]
pub struct EventFormPage {
    pub layout: Layout,
    pub heading: String,
    pub submit_to: String,
    pub form: EventForm,
    pub entity_options: Vec<SelectOption>,
    pub person_options: Vec<SelectOption>,
    pub type_options: Vec<SelectOption>,
}

// --- Actions ---

pub struct ActionRow {
    pub action: Action,
    pub entity_name: Option<String>,
}

#[derive(Template)]
#[template(path = "actions/list.html")]
pub struct ActionListPage {
    pub layout: Layout,
    pub actions: Vec<ActionRow>,
    pub q: String,
    pub entity_options: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "actions/form.html")]
pub struct ActionFormPage {
    pub layout: Layout,
    pub heading: String,
    pub submit_to: String,
    pub form: ActionForm,
    pub entity_options: Vec<SelectOption>,
    pub status_options: Vec<SelectOption>,
    pub priority_options: Vec<SelectOption>,
}

/// The search box value to echo back into a list page.
pub fn search_term(filter: &ListFilter) -> String {
    filter.q.clone().unwrap_or_default()
}
