use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminRole;

// --- Rows (Mapped to Database) ---

/// Category
///
/// A section of the menu (`public.categories`), e.g. "Starters" or "Wines".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    // URL-safe identifier used by the public menu page.
    pub slug: String,
    // Display order, ascending.
    pub position: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// MenuItem
///
/// A dish or drink (`public.menu_items`). Prices are stored in cents.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct MenuItem {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    // Hidden from the public menu when false (sold out, seasonal).
    pub is_available: bool,
    pub position: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Reservation
///
/// A table or event booking request (`public.reservations`). Created by the public
/// form as `pending`; staff confirm or cancel it from the back-office.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Reservation {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub party_size: i32,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub message: Option<String>,
    // 'pending' | 'confirmed' | 'cancelled'
    pub status: String,
    // Principal userId of the staff member who last changed the status.
    pub confirmed_by: Option<String>,
    #[ts(type = "string | null")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AdminUser
///
/// Back-office membership (`public.admin_users`). The `id` is the hosted auth
/// provider's user id; the role decides what the session credential asserts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// DashboardStats
///
/// Counters for the back-office landing page (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_categories: i64,
    pub total_menu_items: i64,
    pub pending_reservations: i64,
    /// Confirmed reservations dated today or later.
    pub upcoming_reservations: i64,
}

// --- Request Payloads ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// CreateReservationRequest
///
/// Input of the public reservation form (POST /reservations).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateReservationRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub party_size: i32,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub message: Option<String>,
}

impl CreateReservationRequest {
    /// Checks the form against the venue's rules. Returns the first problem found.
    pub fn validate(&self, today: NaiveDate, max_party_size: i32) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if !is_plausible_email(&self.email) {
            return Err("A valid email address is required".to_string());
        }
        if self.party_size < 1 || self.party_size > max_party_size {
            return Err(format!(
                "Party size must be between 1 and {max_party_size}"
            ));
        }
        if self.reservation_date < today {
            return Err("Reservation date cannot be in the past".to_string());
        }
        Ok(())
    }
}

/// Body of PATCH /admin/reservations/{id}/status.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReservationStatusRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Derived from `name` when omitted.
    pub slug: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMenuItemRequest {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub position: i32,
}

/// UpdateMenuItemRequest
///
/// Partial update; only provided fields change (COALESCE in the repository).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMenuItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

/// LoginRequest
///
/// Credentials are passed through to the hosted auth provider, never stored or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateAdminUserRequest {
    pub email: String,
    pub password: String,
    pub role: AdminRole,
}

fn default_true() -> bool {
    true
}

pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Lowercases `name` and joins its alphanumeric runs with single dashes.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
