use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod views;

// Module for routing segregation (Public, Authenticated, Admin, API).
pub mod routes;
use auth::AuthUser;
use routes::{admin, api, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::{AppError, StoreError};
pub use repository::{
    MemoryRepository, PostgresRepository, Repository, RepositoryState, RestRepository,
};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
/// The HTML portal is not described here.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::api::get_me, handlers::api::list_users, handlers::api::create_user,
        handlers::api::list_entities,
        handlers::api::get_entity, handlers::api::list_persons, handlers::api::list_events,
        handlers::api::list_actions
    ),
    components(
        schemas(
            models::Entity, models::Person, models::Event, models::Action,
            models::EventListItem, models::EntityDetail, models::UserProfile,
            models::NewUserRequest, auth::Role,
        )
    ),
    tags(
        (name = "crm-portal", description = "CRM Portal API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single state container shared by every request: the store behind the
/// `Repository` trait and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: one of the REST, Postgres or in-memory stores.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and extractors pull single components out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Session guard for the authenticated router. Extracting `AuthUser` fails
/// without a valid session cookie, and its rejection (a 303 to /login with a
/// flash) is returned before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: the admin check is done by the `AdminUser` extractor in each handler.
        .merge(admin::admin_routes())
        // JSON API: 401/403 instead of redirects, via the `ApiUser` extractor.
        .nest("/api", api::api_routes())
        // Apply the Unified State to all routes.
        .with_state(state);

    // 2. Observability and Correlation Layers
    base_router.layer(
        ServiceBuilder::new()
            // 2a. Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 2b. Request Tracing: one span per request, carrying the request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 2c. Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`. Puts method, URI and the `x-request-id` set by
/// `SetRequestIdLayer` on the span so every log line of a request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
