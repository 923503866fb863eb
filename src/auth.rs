use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    flash::{self, Flash},
};

pub const SESSION_COOKIE: &str = "session";

/// SessionClaims
///
/// Payload of the signed session cookie. Holds only the authenticated user's
/// email (as the subject) and display name, plus the standard timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (sub): the user's email.
    pub sub: String,
    /// Display name shown in the page header.
    pub name: String,
    /// Expiration Time (exp): the session is rejected after this instant.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Role
///
/// Resolved per request from the configured admin set; never stored in the
/// session, so changing `ADMIN_EMAILS` takes effect on the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// AuthUser
///
/// The resolved identity of a request carrying a valid session cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// issue_session
///
/// Signs a session for `email`/`name` and stores it in the session cookie.
pub fn issue_session(
    jar: CookieJar,
    config: &AppConfig,
    email: &str,
    name: &str,
) -> Result<CookieJar, AppError> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: email.to_string(),
        name: name.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.session_ttl_hours)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )?;

    Ok(jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(config.env == Env::Production),
    ))
}

/// read_session
///
/// Resolves the session cookie into an `AuthUser`. A missing, expired, or
/// foreign-signed cookie all read as "no session".
pub fn read_session(jar: &CookieJar, config: &AppConfig) -> Option<AuthUser> {
    let token = jar.get(SESSION_COOKIE)?;

    let decoded = decode::<SessionClaims>(
        token.value(),
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &Validation::default(),
    );

    match decoded {
        Ok(data) => {
            let claims = data.claims;
            let role = if config.is_admin(&claims.sub) {
                Role::Admin
            } else {
                Role::Member
            };
            Some(AuthUser {
                email: claims.sub,
                name: claims.name,
                role,
            })
        }
        Err(e) => {
            tracing::debug!("rejected session cookie: {}", e);
            None
        }
    }
}

/// Drops the session cookie.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

// --- Extractors ---

/// AuthRedirect
///
/// Rejection for browser routes: back to the login form with a notice.
#[derive(Debug)]
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        flash::redirect(
            CookieJar::new(),
            Flash::info("Please log in to continue."),
            "/login",
        )
        .into_response()
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument and as the guard of the
/// authenticated router. Rejects with `AuthRedirect`, so protected routes never
/// run (and never touch the store) without a valid session.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        read_session(&jar, &config).ok_or(AuthRedirect)
    }
}

/// AdminUser
///
/// An `AuthUser` whose role is `Admin`. Guards user registration.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[derive(Debug)]
pub enum AdminRejection {
    Unauthenticated(AuthRedirect),
    Forbidden,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::Unauthenticated(redirect) => redirect.into_response(),
            AdminRejection::Forbidden => flash::redirect(
                CookieJar::new(),
                Flash::error("You are not authorized to register users."),
                "/welcome",
            )
            .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Unauthenticated)?;

        if !user.is_admin() {
            tracing::warn!(email = %user.email, "non-admin session refused on admin route");
            return Err(AdminRejection::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

/// ApiUser
///
/// Session identity for the JSON API. Same cookie, but rejects with a bare 401
/// instead of a redirect.
#[derive(Debug, Clone)]
pub struct ApiUser(pub AuthUser);

impl<S> FromRequestParts<S> for ApiUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state)
            .await
            .map(ApiUser)
            .map_err(|_| StatusCode::UNAUTHORIZED)
    }
}
