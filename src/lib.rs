use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;

// Routing split by access level (public site, guarded back-office).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use auth::{AdminGuard, AdminPrincipal, AdminRole};
pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityProvider, SupabaseAuthClient};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every handler annotated with `#[utoipa::path]`, served at
/// `/api-docs/openapi.json` and browsable through `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_categories, handlers::get_menu, handlers::get_menu_item,
        handlers::create_reservation, handlers::login, handlers::logout, handlers::get_session,
        handlers::get_stats, handlers::list_reservations, handlers::get_reservation,
        handlers::update_reservation_status, handlers::delete_reservation,
        handlers::list_all_menu_items, handlers::set_menu_item_availability,
        handlers::create_menu_item, handlers::update_menu_item, handlers::delete_menu_item,
        handlers::create_category, handlers::update_category, handlers::delete_category,
        handlers::list_admin_users, handlers::create_admin_user
    ),
    components(
        schemas(
            models::Category, models::MenuItem, models::Reservation, models::AdminUser,
            models::DashboardStats, models::ReservationStatus, models::CreateReservationRequest,
            models::ReservationStatusRequest, models::CreateCategoryRequest,
            models::UpdateCategoryRequest, models::CreateMenuItemRequest,
            models::UpdateMenuItemRequest, models::AvailabilityRequest, models::LoginRequest,
            models::CreateAdminUserRequest, auth::AdminPrincipal, auth::AdminRole,
        )
    ),
    tags(
        (name = "venue-portal", description = "Venue website and back-office API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state handed to every handler. All members are cheap to clone
/// and immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Hosted database access.
    pub repo: RepositoryState,
    /// Hosted auth provider (password sign-in, user management).
    pub identity: IdentityState,
    /// Admin credential verifier, built once from `config`.
    pub guard: AdminGuard,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Assembles the state, deriving the guard from the configured secret.
    pub fn new(repo: RepositoryState, identity: IdentityState, config: AppConfig) -> Self {
        Self {
            repo,
            identity,
            guard: AdminGuard::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AdminGuard {
    fn from_ref(app_state: &AppState) -> AdminGuard {
        app_state.guard.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing tree, applies the observability layers and registers the
/// application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Each admin route carries its own guard wrapper (see routes::admin).
        .nest("/admin", admin::admin_routes(&state.guard))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, correlated by `x-request-id`. Headers other than the
/// request id are not recorded, so session cookies never reach the logs.
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
