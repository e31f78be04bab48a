use crate::{
    AppState,
    auth::{AdminPrincipal, AdminRole, issue_admin_token, logout_cookie, session_cookie},
    config::Env,
    error::ApiError,
    identity::IdentityError,
    models::{
        self, AdminUser, AvailabilityRequest, Category, CreateAdminUserRequest,
        CreateCategoryRequest, CreateMenuItemRequest, CreateReservationRequest, DashboardStats,
        LoginRequest, MenuItem, Reservation, ReservationStatus, ReservationStatusRequest,
        UpdateCategoryRequest, UpdateMenuItemRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// MenuFilter
///
/// Query parameters for the menu listings (GET /menu, GET /admin/menu).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct MenuFilter {
    /// Only items of this category.
    pub category: Option<Uuid>,
}

/// ReservationFilter
///
/// Query parameters for GET /admin/reservations.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ReservationFilter {
    /// One of `pending`, `confirmed`, `cancelled`.
    pub status: Option<ReservationStatus>,
}

// --- Public Handlers ---

/// list_categories
///
/// [Public Route] Menu sections in display order.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.repo.list_categories().await)
}

/// get_menu
///
/// [Public Route] Available menu items, optionally narrowed to one category.
#[utoipa::path(
    get,
    path = "/menu",
    params(MenuFilter),
    responses((status = 200, description = "Available menu items", body = [MenuItem]))
)]
pub async fn get_menu(
    State(state): State<AppState>,
    Query(filter): Query<MenuFilter>,
) -> Json<Vec<MenuItem>> {
    Json(state.repo.list_menu_items(filter.category, true).await)
}

/// get_menu_item
///
/// [Public Route] A single menu item. Unavailable items are reported as missing.
#[utoipa::path(
    get,
    path = "/menu/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Found", body = MenuItem),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MenuItem>, ApiError> {
    state
        .repo
        .get_menu_item(id)
        .await
        .filter(|item| item.is_available)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Menu item not found".to_string()))
}

/// create_reservation
///
/// [Public Route] Accepts the reservation form. The booking starts as `pending`
/// until a staff member confirms it.
#[utoipa::path(
    post,
    path = "/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation received", body = Reservation),
        (status = 400, description = "Invalid form")
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    payload
        .validate(Utc::now().date_naive(), state.config.max_party_size)
        .map_err(ApiError::BadRequest)?;

    let reservation = state
        .repo
        .create_reservation(payload)
        .await
        .ok_or_else(|| ApiError::Internal("failed to store reservation".to_string()))?;

    tracing::info!(
        reservation_id = %reservation.id,
        party_size = reservation.party_size,
        "reservation received"
    );
    Ok((StatusCode::CREATED, Json(reservation)))
}

// --- Session Handlers ---

/// login
///
/// [Public Route] Signs a staff member in through the hosted auth provider, looks up
/// their back-office role and sets the admin session cookie.
///
/// Accounts without an `admin_users` row, or whose stored role is not a known role,
/// are refused.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AdminPrincipal),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Not a back-office user")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .identity
        .sign_in(payload.email.trim(), &payload.password)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let admin = state
        .repo
        .get_admin_user(user.id)
        .await
        .ok_or_else(|| ApiError::Forbidden("Not an admin user".to_string()))?;

    let role = admin.role.parse::<AdminRole>().map_err(|e| {
        tracing::warn!(user_id = %admin.id, error = %e, "admin_users row carries an unknown role");
        ApiError::Forbidden("Not an admin user".to_string())
    })?;

    let principal = AdminPrincipal {
        user_id: admin.id.to_string(),
        email: admin.email,
        role,
    };

    let ttl = state.config.session_ttl_secs;
    let token = issue_admin_token(&principal, &state.config.admin_jwt_secret, ttl)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let cookie = session_cookie(
        state.guard.cookie_name(),
        token,
        ttl,
        state.config.env == Env::Production,
    );

    tracing::info!(user_id = %principal.user_id, role = %principal.role, "admin signed in");
    Ok(([(header::SET_COOKIE, cookie.to_string())], Json(principal)).into_response())
}

/// logout
///
/// [Public Route] Expires the admin session cookie. Safe to call without a session.
#[utoipa::path(
    post,
    path = "/admin/logout",
    responses((status = 204, description = "Session cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = logout_cookie(
        state.guard.cookie_name(),
        state.config.env == Env::Production,
    );
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie.to_string())]).into_response()
}

/// get_session
///
/// [Any Admin] The principal resolved from the session cookie.
#[utoipa::path(
    get,
    path = "/admin/session",
    responses(
        (status = 200, description = "Current principal", body = AdminPrincipal),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_session(principal: AdminPrincipal) -> Json<AdminPrincipal> {
    Json(principal)
}

// --- Back-office Handlers ---

/// get_stats
///
/// [Any Admin] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn get_stats(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
) -> Json<DashboardStats> {
    Json(state.repo.get_stats().await)
}

/// list_reservations
///
/// [Any Admin] All reservations by date, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/admin/reservations",
    params(ReservationFilter),
    responses((status = 200, description = "Reservations", body = [Reservation]))
)]
pub async fn list_reservations(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Query(filter): Query<ReservationFilter>,
) -> Json<Vec<Reservation>> {
    Json(state.repo.list_reservations(filter.status).await)
}

/// get_reservation
///
/// [Any Admin] A single reservation.
#[utoipa::path(
    get,
    path = "/admin/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Found", body = Reservation),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_reservation(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, ApiError> {
    state
        .repo
        .get_reservation(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))
}

/// update_reservation_status
///
/// [Any Admin] Confirms, cancels or reopens a reservation. The acting principal's
/// `userId` is stamped into `confirmed_by`.
#[utoipa::path(
    patch,
    path = "/admin/reservations/{id}/status",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = ReservationStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Reservation),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_reservation_status(
    principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReservationStatusRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .repo
        .update_reservation_status(id, payload.status, &principal.user_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    tracing::info!(
        reservation_id = %id,
        status = payload.status.as_str(),
        by = %principal.user_id,
        "reservation status changed"
    );
    Ok(Json(reservation))
}

/// delete_reservation
///
/// [Privileged] Removes a reservation. Employees are stopped by the route guard.
#[utoipa::path(
    delete,
    path = "/admin/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_reservation(
    principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.repo.delete_reservation(id).await {
        return Err(ApiError::NotFound("Reservation not found".to_string()));
    }
    tracing::info!(reservation_id = %id, by = %principal.user_id, "reservation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// list_all_menu_items
///
/// [Any Admin] Every menu item, including unavailable ones.
#[utoipa::path(
    get,
    path = "/admin/menu",
    params(MenuFilter),
    responses((status = 200, description = "All menu items", body = [MenuItem]))
)]
pub async fn list_all_menu_items(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Query(filter): Query<MenuFilter>,
) -> Json<Vec<MenuItem>> {
    Json(state.repo.list_menu_items(filter.category, false).await)
}

/// set_menu_item_availability
///
/// [Any Admin] Marks an item sold out or back on the menu. Open to employees so the
/// floor can react during service.
#[utoipa::path(
    patch,
    path = "/admin/menu/{id}/availability",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Updated", body = MenuItem),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_menu_item_availability(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    state
        .repo
        .set_menu_item_availability(id, payload.is_available)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Menu item not found".to_string()))
}

/// create_menu_item
///
/// [Privileged] Adds a menu item.
#[utoipa::path(
    post,
    path = "/admin/menu",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Created", body = MenuItem),
        (status = 400, description = "Invalid item")
    )
)]
pub async fn create_menu_item(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    if payload.price_cents < 0 {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }

    let item = state
        .repo
        .create_menu_item(payload)
        .await
        .ok_or_else(|| ApiError::Internal("failed to create menu item".to_string()))?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// update_menu_item
///
/// [Privileged] Partial update of a menu item.
#[utoipa::path(
    put,
    path = "/admin/menu/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Updated", body = MenuItem),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_menu_item(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    if payload.price_cents.is_some_and(|price| price < 0) {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }
    state
        .repo
        .update_menu_item(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Menu item not found".to_string()))
}

/// delete_menu_item
///
/// [Privileged]
#[utoipa::path(
    delete,
    path = "/admin/menu/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_menu_item(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_menu_item(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Menu item not found".to_string()))
    }
}

/// create_category
///
/// [Privileged] Adds a menu section. The slug defaults to a slugified name.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Invalid category")
    )
)]
pub async fn create_category(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    if models::slugify(&payload.name).is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    let category = state
        .repo
        .create_category(payload)
        .await
        .ok_or_else(|| ApiError::Internal("failed to create category".to_string()))?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// update_category
///
/// [Privileged] Partial update of a menu section.
#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    state
        .repo
        .update_category(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
}

/// delete_category
///
/// [Privileged]
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_category(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_category(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Category not found".to_string()))
    }
}

/// list_admin_users
///
/// [Super Admin] Back-office accounts and their roles.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Admin users", body = [AdminUser]))
)]
pub async fn list_admin_users(
    _principal: AdminPrincipal,
    State(state): State<AppState>,
) -> Json<Vec<AdminUser>> {
    Json(state.repo.list_admin_users().await)
}

/// create_admin_user
///
/// [Super Admin] Creates the auth account with the hosted provider, then records the
/// back-office role for it.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateAdminUserRequest,
    responses(
        (status = 201, description = "Created", body = AdminUser),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_admin_user(
    principal: AdminPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<CreateAdminUserRequest>,
) -> Result<(StatusCode, Json<AdminUser>), ApiError> {
    let email = payload.email.trim();
    if !models::is_plausible_email(email) {
        return Err(ApiError::BadRequest("A valid email address is required".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user = state
        .identity
        .create_user(email, &payload.password)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected { status: 422, .. } => {
                ApiError::Conflict("Email already registered".to_string())
            }
            IdentityError::Rejected { status: 400, body } => {
                tracing::warn!(%body, "auth provider refused new account");
                ApiError::BadRequest(
                    "The auth provider rejected this email or password".to_string(),
                )
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    let Some(admin) = state
        .repo
        .upsert_admin_user(user.id, email, payload.role.as_str())
        .await
    else {
        // Without a role row the account is unusable; remove it so the email can be retried.
        if let Err(e) = state.identity.delete_user(user.id).await {
            tracing::error!(user = %user.id, error = %e, "failed to roll back auth account");
        }
        return Err(ApiError::Internal("failed to record admin user".to_string()));
    };

    tracing::info!(
        created = %admin.id,
        role = %payload.role,
        by = %principal.user_id,
        "admin user created"
    );
    Ok((StatusCode::CREATED, Json(admin)))
}
