use crate::models::{
    AdminUser, Category, CreateCategoryRequest, CreateMenuItemRequest, CreateReservationRequest,
    DashboardStats, MenuItem, Reservation, ReservationStatus, UpdateCategoryRequest,
    UpdateMenuItemRequest, slugify,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

const CATEGORY_COLUMNS: &str = "id, name, slug, position, created_at";
const MENU_ITEM_COLUMNS: &str = "id, category_id, name, description, price_cents, is_available, position, created_at, updated_at";
const RESERVATION_COLUMNS: &str = "id, name, email, phone, party_size, reservation_date, reservation_time, message, status, confirmed_by, confirmed_at, created_at";

/// Repository Trait
///
/// The boundary to the hosted database. Handlers only see this trait, so tests can
/// swap in an in-memory implementation. Failures are logged here and surface as
/// empty / `None` / `false` results.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Categories ---
    async fn list_categories(&self) -> Vec<Category>;
    async fn create_category(&self, req: CreateCategoryRequest) -> Option<Category>;
    async fn update_category(&self, id: Uuid, req: UpdateCategoryRequest) -> Option<Category>;
    async fn delete_category(&self, id: Uuid) -> bool;

    // --- Menu ---
    // `available_only` is true for the public menu.
    async fn list_menu_items(
        &self,
        category_id: Option<Uuid>,
        available_only: bool,
    ) -> Vec<MenuItem>;
    async fn get_menu_item(&self, id: Uuid) -> Option<MenuItem>;
    async fn create_menu_item(&self, req: CreateMenuItemRequest) -> Option<MenuItem>;
    async fn update_menu_item(&self, id: Uuid, req: UpdateMenuItemRequest) -> Option<MenuItem>;
    async fn set_menu_item_availability(&self, id: Uuid, is_available: bool) -> Option<MenuItem>;
    async fn delete_menu_item(&self, id: Uuid) -> bool;

    // --- Reservations ---
    async fn create_reservation(&self, req: CreateReservationRequest) -> Option<Reservation>;
    async fn list_reservations(&self, status: Option<ReservationStatus>) -> Vec<Reservation>;
    async fn get_reservation(&self, id: Uuid) -> Option<Reservation>;
    // Stamps `confirmed_by` / `confirmed_at` with the acting staff member.
    async fn update_reservation_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        acted_by: &str,
    ) -> Option<Reservation>;
    async fn delete_reservation(&self, id: Uuid) -> bool;

    // --- Admin users ---
    async fn list_admin_users(&self) -> Vec<AdminUser>;
    async fn get_admin_user(&self, id: Uuid) -> Option<AdminUser>;
    async fn upsert_admin_user(&self, id: Uuid, email: &str, role: &str) -> Option<AdminUser>;

    async fn get_stats(&self) -> DashboardStats;
}

/// RepositoryState
///
/// Shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the hosted Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_categories(&self) -> Vec<Category> {
        let sql =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY position ASC, name ASC");
        sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_categories error: {:?}", e);
                vec![]
            })
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Option<Category> {
        let slug = req
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| slugify(&req.name));
        let sql = format!(
            "INSERT INTO categories (id, name, slug, position, created_at) VALUES ($1, $2, $3, $4, NOW()) RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name)
            .bind(slug)
            .bind(req.position)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| tracing::error!("create_category error: {:?}", e))
            .ok()
    }

    /// Partial update; `COALESCE` keeps columns whose field is `None`.
    async fn update_category(&self, id: Uuid, req: UpdateCategoryRequest) -> Option<Category> {
        let sql = format!(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                position = COALESCE($4, position)
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.slug)
            .bind(req.position)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_category error: {:?}", e);
                None
            })
    }

    async fn delete_category(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_category error: {:?}", e);
                false
            }
        }
    }

    /// Builds the filter with QueryBuilder so every value stays a bound parameter.
    async fn list_menu_items(
        &self,
        category_id: Option<Uuid>,
        available_only: bool,
    ) -> Vec<MenuItem> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE 1 = 1"));

        if let Some(category_id) = category_id {
            builder.push(" AND category_id = ");
            builder.push_bind(category_id);
        }
        if available_only {
            builder.push(" AND is_available = true");
        }
        builder.push(" ORDER BY position ASC, name ASC");

        builder
            .build_query_as::<MenuItem>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_menu_items error: {:?}", e);
                vec![]
            })
    }

    async fn get_menu_item(&self, id: Uuid) -> Option<MenuItem> {
        let sql = format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = $1");
        sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_menu_item error: {:?}", e);
                None
            })
    }

    async fn create_menu_item(&self, req: CreateMenuItemRequest) -> Option<MenuItem> {
        let sql = format!(
            r#"
            INSERT INTO menu_items (id, category_id, name, description, price_cents, is_available, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {MENU_ITEM_COLUMNS}
            "#
        );
        sqlx::query_as::<_, MenuItem>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.category_id)
            .bind(req.name)
            .bind(req.description)
            .bind(req.price_cents)
            .bind(req.is_available)
            .bind(req.position)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| tracing::error!("create_menu_item error: {:?}", e))
            .ok()
    }

    async fn update_menu_item(&self, id: Uuid, req: UpdateMenuItemRequest) -> Option<MenuItem> {
        let sql = format!(
            r#"
            UPDATE menu_items
            SET category_id = COALESCE($2, category_id),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                price_cents = COALESCE($5, price_cents),
                is_available = COALESCE($6, is_available),
                position = COALESCE($7, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MENU_ITEM_COLUMNS}
            "#
        );
        sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .bind(req.category_id)
            .bind(req.name)
            .bind(req.description)
            .bind(req.price_cents)
            .bind(req.is_available)
            .bind(req.position)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_menu_item error: {:?}", e);
                None
            })
    }

    async fn set_menu_item_availability(&self, id: Uuid, is_available: bool) -> Option<MenuItem> {
        let sql = format!(
            "UPDATE menu_items SET is_available = $2, updated_at = NOW() WHERE id = $1 RETURNING {MENU_ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .bind(is_available)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("availability error: {:?}", e);
                None
            })
    }

    async fn delete_menu_item(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_menu_item error: {:?}", e);
                false
            }
        }
    }

    /// New reservations always start as `pending`.
    async fn create_reservation(&self, req: CreateReservationRequest) -> Option<Reservation> {
        let sql = format!(
            r#"
            INSERT INTO reservations (id, name, email, phone, party_size, reservation_date, reservation_time, message, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', NOW())
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Reservation>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name.trim())
            .bind(req.email.trim())
            .bind(req.phone)
            .bind(req.party_size)
            .bind(req.reservation_date)
            .bind(req.reservation_time)
            .bind(req.message)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| tracing::error!("create_reservation error: {:?}", e))
            .ok()
    }

    async fn list_reservations(&self, status: Option<ReservationStatus>) -> Vec<Reservation> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {RESERVATION_COLUMNS} FROM reservations"));
        if let Some(status) = status {
            builder.push(" WHERE status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" ORDER BY reservation_date ASC, reservation_time ASC");

        builder
            .build_query_as::<Reservation>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_reservations error: {:?}", e);
                vec![]
            })
    }

    async fn get_reservation(&self, id: Uuid) -> Option<Reservation> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_reservation error: {:?}", e);
                None
            })
    }

    async fn update_reservation_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        acted_by: &str,
    ) -> Option<Reservation> {
        let sql = format!(
            r#"
            UPDATE reservations
            SET status = $2,
                confirmed_by = $3,
                confirmed_at = NOW()
            WHERE id = $1
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(acted_by)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_reservation_status error: {:?}", e);
                None
            })
    }

    async fn delete_reservation(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_reservation error: {:?}", e);
                false
            }
        }
    }

    async fn list_admin_users(&self) -> Vec<AdminUser> {
        sqlx::query_as::<_, AdminUser>(
            "SELECT id, email, role, created_at FROM admin_users ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_admin_users error: {:?}", e);
            vec![]
        })
    }

    async fn get_admin_user(&self, id: Uuid) -> Option<AdminUser> {
        sqlx::query_as::<_, AdminUser>(
            "SELECT id, email, role, created_at FROM admin_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_admin_user error: {:?}", e);
            None
        })
    }

    async fn upsert_admin_user(&self, id: Uuid, email: &str, role: &str) -> Option<AdminUser> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (id, email, role, created_at) VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, role = EXCLUDED.role
            RETURNING id, email, role, created_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("upsert_admin_user error: {:?}", e))
        .ok()
    }

    /// All dashboard counters in one round trip.
    async fn get_stats(&self) -> DashboardStats {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM categories),
                (SELECT COUNT(*) FROM menu_items),
                (SELECT COUNT(*) FROM reservations WHERE status = 'pending'),
                (SELECT COUNT(*) FROM reservations WHERE status = 'confirmed' AND reservation_date >= CURRENT_DATE)
            "#,
        )
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok((
                total_categories,
                total_menu_items,
                pending_reservations,
                upcoming_reservations,
            )) => DashboardStats {
                total_categories,
                total_menu_items,
                pending_reservations,
                upcoming_reservations,
            },
            Err(e) => {
                tracing::error!("get_stats error: {:?}", e);
                DashboardStats::default()
            }
        }
    }
}
