#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Response};
use chrono::{NaiveDate, NaiveTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use venue_portal::{
    AppState, MockIdentityProvider,
    auth::{AdminPrincipal, AdminRole, issue_admin_token},
    config::AppConfig,
    models::{
        AdminUser, Category, CreateCategoryRequest, CreateMenuItemRequest,
        CreateReservationRequest, DashboardStats, MenuItem, Reservation, ReservationStatus,
        UpdateCategoryRequest, UpdateMenuItemRequest, slugify,
    },
    repository::Repository,
};

// --- Shared Fixtures ---

pub const TEST_SECRET: &str = "test-admin-secret-value-0123456789";
pub const COOKIE_NAME: &str = "admin_token";

pub const EMPLOYEE_ID: Uuid = Uuid::from_u128(1);
pub const ADMIN_ID: Uuid = Uuid::from_u128(2);
pub const SUPER_ADMIN_ID: Uuid = Uuid::from_u128(3);

pub fn test_config() -> AppConfig {
    AppConfig {
        admin_jwt_secret: TEST_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(repo: MockRepo, identity: MockIdentityProvider) -> AppState {
    AppState::new(Arc::new(repo), Arc::new(identity), test_config())
}

pub fn principal(role: AdminRole) -> AdminPrincipal {
    let id = match role {
        AdminRole::Employee => EMPLOYEE_ID,
        AdminRole::Admin => ADMIN_ID,
        AdminRole::SuperAdmin => SUPER_ADMIN_ID,
    };
    AdminPrincipal {
        user_id: id.to_string(),
        email: format!("{}@venue.test", role.as_str()),
        role,
    }
}

/// A valid credential for `role`, signed with `TEST_SECRET`.
pub fn token_for(role: AdminRole) -> String {
    issue_admin_token(&principal(role), TEST_SECRET, 3600).unwrap()
}

/// Signs arbitrary claims, bypassing the typed issuer.
pub fn forge_token(claims: serde_json::Value, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn cookie_header(token: &str) -> String {
    format!("{COOKIE_NAME}={token}")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn tomorrow() -> NaiveDate {
    Utc::now().date_naive().succ_opt().unwrap()
}

pub fn reservation(id: Uuid, status: ReservationStatus) -> Reservation {
    Reservation {
        id,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        party_size: 4,
        reservation_date: tomorrow(),
        reservation_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
        status: status.as_str().to_string(),
        created_at: Utc::now(),
        ..Reservation::default()
    }
}

pub fn menu_item(id: Uuid, is_available: bool) -> MenuItem {
    MenuItem {
        id,
        name: format!("Dish {id}"),
        price_cents: 1250,
        is_available,
        ..MenuItem::default()
    }
}

pub fn admin_user(id: Uuid, role: &str) -> AdminUser {
    AdminUser {
        id,
        email: format!("{role}@venue.test"),
        role: role.to_string(),
        created_at: Utc::now(),
    }
}

// --- In-Memory Repository ---

/// Handlers depend on the `Repository` trait, so tests run against this
/// in-memory implementation instead of Postgres.
#[derive(Default)]
pub struct MockRepo {
    pub categories: Mutex<Vec<Category>>,
    pub menu_items: Mutex<Vec<MenuItem>>,
    pub reservations: Mutex<Vec<Reservation>>,
    pub admin_users: Mutex<Vec<AdminUser>>,
    pub stats: DashboardStats,
    /// When true, `upsert_admin_user` fails as if the database were down.
    pub reject_admin_upserts: bool,
}

impl MockRepo {
    pub fn with_reservations(self, rows: Vec<Reservation>) -> Self {
        *self.reservations.lock().unwrap() = rows;
        self
    }

    pub fn with_menu_items(self, rows: Vec<MenuItem>) -> Self {
        *self.menu_items.lock().unwrap() = rows;
        self
    }

    pub fn with_admin_users(self, rows: Vec<AdminUser>) -> Self {
        *self.admin_users.lock().unwrap() = rows;
        self
    }

    pub fn rejecting_admin_upserts(self) -> Self {
        Self {
            reject_admin_upserts: true,
            ..self
        }
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn list_categories(&self) -> Vec<Category> {
        self.categories.lock().unwrap().clone()
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Option<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            slug: req.slug.unwrap_or_else(|| slugify(&req.name)),
            name: req.name,
            position: req.position,
            created_at: Utc::now(),
        };
        self.categories.lock().unwrap().push(category.clone());
        Some(category)
    }

    async fn update_category(&self, id: Uuid, req: UpdateCategoryRequest) -> Option<Category> {
        let mut rows = self.categories.lock().unwrap();
        let row = rows.iter_mut().find(|c| c.id == id)?;
        if let Some(name) = req.name {
            row.name = name;
        }
        if let Some(slug) = req.slug {
            row.slug = slug;
        }
        if let Some(position) = req.position {
            row.position = position;
        }
        Some(row.clone())
    }

    async fn delete_category(&self, id: Uuid) -> bool {
        let mut rows = self.categories.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        rows.len() != before
    }

    async fn list_menu_items(
        &self,
        category_id: Option<Uuid>,
        available_only: bool,
    ) -> Vec<MenuItem> {
        self.menu_items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| category_id.is_none_or(|c| item.category_id == c))
            .filter(|item| !available_only || item.is_available)
            .cloned()
            .collect()
    }

    async fn get_menu_item(&self, id: Uuid) -> Option<MenuItem> {
        self.menu_items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    async fn create_menu_item(&self, req: CreateMenuItemRequest) -> Option<MenuItem> {
        let item = MenuItem {
            id: Uuid::new_v4(),
            category_id: req.category_id,
            name: req.name,
            description: req.description,
            price_cents: req.price_cents,
            is_available: req.is_available,
            position: req.position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.menu_items.lock().unwrap().push(item.clone());
        Some(item)
    }

    async fn update_menu_item(&self, id: Uuid, req: UpdateMenuItemRequest) -> Option<MenuItem> {
        let mut rows = self.menu_items.lock().unwrap();
        let row = rows.iter_mut().find(|item| item.id == id)?;
        if let Some(name) = req.name {
            row.name = name;
        }
        if let Some(price) = req.price_cents {
            row.price_cents = price;
        }
        if let Some(is_available) = req.is_available {
            row.is_available = is_available;
        }
        Some(row.clone())
    }

    async fn set_menu_item_availability(&self, id: Uuid, is_available: bool) -> Option<MenuItem> {
        let mut rows = self.menu_items.lock().unwrap();
        let row = rows.iter_mut().find(|item| item.id == id)?;
        row.is_available = is_available;
        Some(row.clone())
    }

    async fn delete_menu_item(&self, id: Uuid) -> bool {
        let mut rows = self.menu_items.lock().unwrap();
        let before = rows.len();
        rows.retain(|item| item.id != id);
        rows.len() != before
    }

    async fn create_reservation(&self, req: CreateReservationRequest) -> Option<Reservation> {
        let reservation = Reservation {
            id: Uuid::new_v4(),
            name: req.name,
            email: req.email,
            phone: req.phone,
            party_size: req.party_size,
            reservation_date: req.reservation_date,
            reservation_time: req.reservation_time,
            message: req.message,
            status: ReservationStatus::Pending.as_str().to_string(),
            confirmed_by: None,
            confirmed_at: None,
            created_at: Utc::now(),
        };
        self.reservations.lock().unwrap().push(reservation.clone());
        Some(reservation)
    }

    async fn list_reservations(&self, status: Option<ReservationStatus>) -> Vec<Reservation> {
        self.reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s.as_str()))
            .cloned()
            .collect()
    }

    async fn get_reservation(&self, id: Uuid) -> Option<Reservation> {
        self.reservations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    async fn update_reservation_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        acted_by: &str,
    ) -> Option<Reservation> {
        let mut rows = self.reservations.lock().unwrap();
        let row = rows.iter_mut().find(|r| r.id == id)?;
        row.status = status.as_str().to_string();
        row.confirmed_by = Some(acted_by.to_string());
        row.confirmed_at = Some(Utc::now());
        Some(row.clone())
    }

    async fn delete_reservation(&self, id: Uuid) -> bool {
        let mut rows = self.reservations.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        rows.len() != before
    }

    async fn list_admin_users(&self) -> Vec<AdminUser> {
        self.admin_users.lock().unwrap().clone()
    }

    async fn get_admin_user(&self, id: Uuid) -> Option<AdminUser> {
        self.admin_users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    async fn upsert_admin_user(&self, id: Uuid, email: &str, role: &str) -> Option<AdminUser> {
        if self.reject_admin_upserts {
            return None;
        }
        let mut rows = self.admin_users.lock().unwrap();
        rows.retain(|u| u.id != id);
        let user = admin_user(id, role);
        let user = AdminUser {
            email: email.to_string(),
            ..user
        };
        rows.push(user.clone());
        Some(user)
    }

    async fn get_stats(&self) -> DashboardStats {
        self.stats.clone()
    }
}
