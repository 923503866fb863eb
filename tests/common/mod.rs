#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use crm_portal::{
    AppConfig, AppState,
    config::MIN_BCRYPT_COST,
    create_router,
    models::NewUser,
    password,
    repository::{MemoryRepository, Repository},
};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const MEMBER_EMAIL: &str = "member@example.com";
pub const MEMBER_PASSWORD: &str = "member-password";

// --- Test Context and Setup ---

/// The full router over an in-memory store, seeded with one admin and one member.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub config: AppConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        seed_user(&repo, "Admin", ADMIN_EMAIL, ADMIN_PASSWORD).await;
        seed_user(&repo, "Member", MEMBER_EMAIL, MEMBER_PASSWORD).await;

        let state = AppState {
            repo: repo.clone(),
            config: config.clone(),
        };

        TestApp {
            router: create_router(state),
            repo,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, path: &str, cookies: &[&str]) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POSTs an already urlencoded form body.
    pub async fn post_form(&self, path: &str, form: &str, cookies: &[&str]) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// Logs in through the form and returns the `session=...` cookie pair.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let body = form(&[("email", email), ("password", password)]);
        let response = self.post_form("/login", &body, &[]).await;
        assert_eq!(response.status(), 303, "login for {email} should redirect");
        cookie_pair(&response, "session").expect("login sets the session cookie")
    }

    pub async fn login_admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn login_member(&self) -> String {
        self.login(MEMBER_EMAIL, MEMBER_PASSWORD).await
    }

    /// Follows a redirect the way a browser would, carrying the session and any
    /// flash cookie the redirect set. Returns the rendered page.
    pub async fn follow(&self, response: &Response<Body>, session: Option<&str>) -> String {
        let to = location(response).to_string();
        let mut cookies: Vec<String> = session.into_iter().map(str::to_string).collect();
        if let Some(flash) = cookie_pair(response, "flash") {
            cookies.push(flash);
        }
        let refs: Vec<&str> = cookies.iter().map(String::as_str).collect();
        body_text(self.get(&to, &refs).await).await
    }
}

pub async fn seed_user(repo: &MemoryRepository, name: &str, email: &str, password: &str) {
    let password_hash = password::hash_password(password, MIN_BCRYPT_COST)
        .await
        .unwrap();
    repo.create_user(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash,
    })
    .await
    .unwrap();
}

// --- Response Helpers ---

/// `name=value` of the first Set-Cookie for `name` with a non-empty value.
pub fn cookie_pair(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| key.trim() == name && !value.is_empty())
        .map(|(key, value)| format!("{}={}", key.trim(), value))
}

/// True when the response tells the browser to drop cookie `name`.
pub fn clears_cookie(response: &Response<Body>, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| {
            value
                .split(';')
                .next()
                .and_then(|pair| pair.split_once('='))
                .is_some_and(|(key, value)| key.trim() == name && value.is_empty())
        })
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Encodes `fields` as an application/x-www-form-urlencoded body.
pub fn form(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).unwrap()
}
