use std::env;

use crate::error::ConfigError;

/// Default admin account when `ADMIN_EMAILS` is not set.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

/// Lowest work factor bcrypt accepts. Used where hashing speed matters more
/// than strength (tests).
pub const MIN_BCRYPT_COST: u32 = 4;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers and extractors through `FromRef`, as part of the unified
/// `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format, cookie flags and secret handling.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Which backing store to talk to, with its connection values.
    pub store: StoreConfig,
    // HMAC secret used to sign session cookies.
    pub session_secret: String,
    // Set when no secret was configured and a random one was generated at start.
    pub session_secret_generated: bool,
    // Lifetime of an issued session.
    pub session_ttl_hours: i64,
    // Emails granted the admin role. Compared case-insensitively.
    pub admin_emails: Vec<String>,
    // bcrypt work factor for new password hashes.
    pub password_cost: u32,
}

/// Env
///
/// Runtime context. `Production` hardens cookies, switches logging to JSON and
/// refuses to start without an explicit session secret.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// StoreConfig
///
/// Connection values for the backing store. The REST variant is the hosted
/// table API (Supabase/PostgREST); `Postgres` talks to the same tables directly.
#[derive(Clone, PartialEq, Debug)]
pub enum StoreConfig {
    Rest { url: String, key: String },
    Postgres { db_url: String },
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for test state scaffolding. Uses the
    /// minimum bcrypt cost so hashing in tests stays fast.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            store: StoreConfig::Rest {
                url: "http://localhost:54321".to_string(),
                key: "test-anon-key".to_string(),
            },
            session_secret: "super-secure-test-secret-value-local".to_string(),
            session_secret_generated: false,
            session_ttl_hours: 12,
            admin_emails: vec![DEFAULT_ADMIN_EMAIL.to_string()],
            password_cost: MIN_BCRYPT_COST,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment. Production demands an explicit
    /// `SESSION_SECRET`; locally a random one is generated, which means sessions
    /// do not survive a restart.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let store = match env::var("DATABASE_URL") {
            Ok(db_url) if !db_url.trim().is_empty() => StoreConfig::Postgres { db_url },
            _ => StoreConfig::Rest {
                url: required("SUPABASE_URL")?,
                key: required("SUPABASE_KEY")?,
            },
        };

        let (session_secret, session_secret_generated) =
            match (env::var("SESSION_SECRET"), &env) {
                (Ok(secret), _) if !secret.is_empty() => (secret, false),
                (_, Env::Production) => return Err(ConfigError::Missing("SESSION_SECRET")),
                (_, Env::Local) => (generate_secret(), true),
            };

        let admin_emails = match env::var("ADMIN_EMAILS") {
            Ok(raw) => parse_admin_emails(&raw),
            Err(_) => vec![DEFAULT_ADMIN_EMAIL.to_string()],
        };

        Ok(Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            store,
            session_secret,
            session_secret_generated,
            session_ttl_hours: parsed("SESSION_TTL_HOURS", 12)?,
            admin_emails,
            password_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }

    /// True when `email` belongs to the configured admin set.
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Splits a comma separated list, dropping blanks. An empty list falls back to
/// the default admin so there is always exactly one privileged account.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    let emails: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_lowercase)
        .collect();

    if emails.is_empty() {
        vec![DEFAULT_ADMIN_EMAIL.to_string()]
    } else {
        emails
    }
}

fn generate_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
