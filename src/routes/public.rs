use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints backing the public pages (menu, reservations). Read-only apart from the
/// reservation form; the public menu only ever lists available items.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /categories
        .route("/categories", get(handlers::list_categories))
        // GET /menu?category=...
        .route("/menu", get(handlers::get_menu))
        // GET /menu/{id}
        .route("/menu/{id}", get(handlers::get_menu_item))
        // POST /reservations
        // The public reservation form. Validated, then stored as 'pending'.
        .route("/reservations", post(handlers::create_reservation))
}
