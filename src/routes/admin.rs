use crate::{
    AppState,
    auth::{AdminGuard, AdminRole},
    guard::{require_any_admin, require_privileged, require_role},
    handlers,
};
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

/// Admin Router Module
///
/// The back-office API, nested under `/admin`.
///
/// Access Control:
/// - login/logout are open (they create and clear the session itself);
/// - `require_any_admin` routes accept every role, `employee` included;
/// - `require_privileged` routes accept `admin` and `super_admin`;
/// - user management is restricted to `super_admin`.
///
/// Handlers receive the resolved `AdminPrincipal` attached by the wrapper.
pub fn admin_routes(guard: &AdminGuard) -> Router<AppState> {
    Router::new()
        // --- Session ---
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/session", require_any_admin(guard, get(handlers::get_session)))
        .route("/stats", require_any_admin(guard, get(handlers::get_stats)))
        // --- Reservations ---
        // Staff of every role triage bookings; only privileged roles may delete them.
        .route(
            "/reservations",
            require_any_admin(guard, get(handlers::list_reservations)),
        )
        .route(
            "/reservations/{id}",
            require_any_admin(guard, get(handlers::get_reservation))
                .merge(require_privileged(guard, delete(handlers::delete_reservation))),
        )
        .route(
            "/reservations/{id}/status",
            require_any_admin(guard, patch(handlers::update_reservation_status)),
        )
        // --- Menu ---
        .route(
            "/menu",
            require_any_admin(guard, get(handlers::list_all_menu_items))
                .merge(require_privileged(guard, post(handlers::create_menu_item))),
        )
        .route(
            "/menu/{id}",
            require_privileged(
                guard,
                put(handlers::update_menu_item).delete(handlers::delete_menu_item),
            ),
        )
        .route(
            "/menu/{id}/availability",
            require_any_admin(guard, patch(handlers::set_menu_item_availability)),
        )
        // --- Categories ---
        .route(
            "/categories",
            require_privileged(guard, post(handlers::create_category)),
        )
        .route(
            "/categories/{id}",
            require_privileged(
                guard,
                put(handlers::update_category).delete(handlers::delete_category),
            ),
        )
        // --- Back-office users ---
        .route(
            "/users",
            require_role(
                guard,
                &[AdminRole::SuperAdmin],
                get(handlers::list_admin_users).post(handlers::create_admin_user),
            ),
        )
}
