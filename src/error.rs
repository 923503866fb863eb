use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// StoreError
///
/// Every failure a `Repository` implementation can report. Handlers single out
/// `Conflict` (duplicate user email); everything else surfaces as a generic
/// server error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store key is not a valid header value")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("store responded with {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("{table} row {id} does not exist")]
    MissingReference { table: &'static str, id: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store returned no row for {0}")]
    EmptyResponse(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment is incomplete.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// AppError
///
/// The error type returned by every handler. Converts into a plain 500 page and
/// logs the underlying cause, so no store detail reaches the browser.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(
                "<!doctype html><title>Server error</title>\
                 <h1>Something went wrong</h1>\
                 <p>The request could not be completed. <a href=\"/welcome\">Back</a></p>",
            ),
        )
            .into_response()
    }
}
