//! Operator tooling for the venue back-office.
//!
//! # Usage
//!
//! ```bash
//! # List auth users with their back-office role
//! venue-admin list-users
//!
//! # Create an auth user and grant it a role
//! venue-admin create-user -e manager@example.com -p 'correct horse' -r admin
//!
//! # Mint a session credential for local testing
//! venue-admin issue-token -u 00000000-0000-0000-0000-000000000001 -e dev@example.com -r super_admin
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - Postgres connection string (user commands)
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `SUPABASE_SERVICE_ROLE_KEY` - auth provider (user commands)
//! - `ADMIN_JWT_SECRET` - must match the server's secret (`issue-token`); optional
//!   outside production, where the server's development secret is used

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;
use venue_portal::{
    auth::{AdminPrincipal, AdminRole, CredentialError, issue_admin_token},
    config::{self, Env},
    identity::{IdentityError, IdentityProvider, SupabaseAuthClient},
    models::{AdminUser, is_plausible_email},
    repository::{PostgresRepository, Repository},
};

#[derive(Parser)]
#[command(name = "venue-admin")]
#[command(author, version, about = "Venue back-office operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List auth users and their back-office roles
    ListUsers,
    /// Create an auth user and grant it a back-office role
    CreateUser {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Role (`employee`, `admin`, `super_admin`)
        #[arg(short, long, default_value = "employee")]
        role: String,
    },
    /// Print a signed admin session credential
    IssueToken {
        /// Principal user id
        #[arg(short, long)]
        user_id: String,

        /// Principal email
        #[arg(short, long)]
        email: String,

        /// Role (`employee`, `admin`, `super_admin`)
        #[arg(short, long)]
        role: String,

        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: employee, admin, super_admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Failed to record admin user {0}")]
    Record(String),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::ListUsers => list_users().await,
        Commands::CreateUser {
            email,
            password,
            role,
        } => create_user(&email, &password, &role).await,
        Commands::IssueToken {
            user_id,
            email,
            role,
            ttl,
        } => issue_token(user_id, email, &role, ttl),
    }
}

fn require_env(key: &'static str) -> Result<String, CliError> {
    std::env::var(key).map_err(|_| CliError::MissingEnvVar(key))
}

fn parse_role(role: &str) -> Result<AdminRole, CliError> {
    role.parse::<AdminRole>()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))
}

async fn connect() -> Result<(PostgresRepository, SupabaseAuthClient), CliError> {
    let database_url = require_env("DATABASE_URL")?;
    let supabase_url = require_env("SUPABASE_URL")?;
    let anon_key = require_env("SUPABASE_ANON_KEY")?;
    let service_key = require_env("SUPABASE_SERVICE_ROLE_KEY")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    Ok((
        PostgresRepository::new(pool),
        SupabaseAuthClient::new(&supabase_url, &anon_key, Some(service_key)),
    ))
}

async fn list_users() -> Result<(), CliError> {
    let (repo, identity) = connect().await?;

    let roles: HashMap<_, _> = repo
        .list_admin_users()
        .await
        .into_iter()
        .map(|admin| (admin.id, admin.role))
        .collect();
    let users = identity.list_users().await?;

    println!("{:<38} {:<40} ROLE", "ID", "EMAIL");
    for user in &users {
        println!(
            "{:<38} {:<40} {}",
            user.id,
            user.email.as_deref().unwrap_or("-"),
            roles.get(&user.id).map(String::as_str).unwrap_or("-"),
        );
    }
    tracing::info!("{} auth users, {} with a back-office role", users.len(), roles.len());
    Ok(())
}

async fn create_user(email: &str, password: &str, role: &str) -> Result<(), CliError> {
    let role = parse_role(role)?;
    if !is_plausible_email(email) {
        return Err(CliError::InvalidEmail(email.to_owned()));
    }

    let (repo, identity) = connect().await?;

    tracing::info!("Creating auth user: {} ({})", email, role);
    let user = identity.create_user(email, password).await?;

    let admin = grant_role(&repo, &identity, user.id, email, role).await?;

    println!("{} {} {}", admin.id, admin.email, admin.role);
    Ok(())
}

/// Records the role for a freshly created auth user. On failure the auth user is
/// deleted again so the email can be reused.
async fn grant_role(
    repo: &dyn Repository,
    identity: &dyn IdentityProvider,
    user_id: Uuid,
    email: &str,
    role: AdminRole,
) -> Result<AdminUser, CliError> {
    if let Some(admin) = repo.upsert_admin_user(user_id, email, role.as_str()).await {
        return Ok(admin);
    }

    tracing::warn!("Recording role failed, removing auth user {user_id}");
    if let Err(e) = identity.delete_user(user_id).await {
        tracing::error!("Rollback of auth user {user_id} failed: {e}");
    }
    Err(CliError::Record(user_id.to_string()))
}

fn issue_token(user_id: String, email: String, role: &str, ttl: u64) -> Result<(), CliError> {
    let env = Env::from_env();
    let secret =
        config::admin_jwt_secret(env).ok_or(CliError::MissingEnvVar("ADMIN_JWT_SECRET"))?;
    if env == Env::Local && std::env::var("ADMIN_JWT_SECRET").is_err() {
        tracing::warn!("ADMIN_JWT_SECRET not set, signing with the local development secret");
    }

    let token = mint_token(user_id, email, role, &secret, ttl)?;
    println!("{token}");
    Ok(())
}

fn mint_token(
    user_id: String,
    email: String,
    role: &str,
    secret: &str,
    ttl: u64,
) -> Result<String, CliError> {
    let principal = AdminPrincipal {
        user_id,
        email,
        role: parse_role(role)?,
    };
    Ok(issue_admin_token(&principal, secret, ttl)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use venue_portal::{
        MockIdentityProvider,
        auth::AdminGuard,
        models::{
            Category, CreateCategoryRequest, CreateMenuItemRequest, CreateReservationRequest,
            DashboardStats, MenuItem, Reservation, ReservationStatus, UpdateCategoryRequest,
            UpdateMenuItemRequest,
        },
    };

    const SECRET: &str = "cli-test-secret";

    #[test]
    fn test_parse_role_accepts_known_roles() {
        assert_eq!(parse_role("employee").unwrap(), AdminRole::Employee);
        assert_eq!(parse_role("admin").unwrap(), AdminRole::Admin);
        assert_eq!(parse_role("super_admin").unwrap(), AdminRole::SuperAdmin);
    }

    #[test]
    fn test_parse_role_rejects_unknown_and_miscased() {
        for role in ["Admin", "owner", ""] {
            assert!(
                matches!(parse_role(role), Err(CliError::InvalidRole(r)) if r == role),
                "{role:?} should be refused"
            );
        }
    }

    #[test]
    fn test_minted_token_is_accepted_by_guard() {
        let token = mint_token(
            "u-7".to_string(),
            "ops@venue.test".to_string(),
            "super_admin",
            SECRET,
            600,
        )
        .unwrap();

        let principal = AdminGuard::new(SECRET, "admin_token")
            .decode_token(&token)
            .unwrap();
        assert_eq!(principal.user_id, "u-7");
        assert_eq!(principal.email, "ops@venue.test");
        assert_eq!(principal.role, AdminRole::SuperAdmin);
    }

    #[test]
    fn test_mint_token_rejects_bad_input() {
        let bad_role = mint_token("u".into(), "e@venue.test".into(), "owner", SECRET, 60);
        assert!(matches!(bad_role, Err(CliError::InvalidRole(_))));

        let no_secret = mint_token("u".into(), "e@venue.test".into(), "admin", "", 60);
        assert!(matches!(
            no_secret,
            Err(CliError::Credential(CredentialError::MissingSecret))
        ));
    }

    /// Refuses every role write.
    struct ReadOnlyRepo;

    #[async_trait::async_trait]
    impl Repository for ReadOnlyRepo {
        async fn list_categories(&self) -> Vec<Category> {
            vec![]
        }
        async fn create_category(
            &self,
            _req: CreateCategoryRequest,
        ) -> Option<Category> {
            None
        }
        async fn update_category(
            &self,
            _id: Uuid,
            _req: UpdateCategoryRequest,
        ) -> Option<Category> {
            None
        }
        async fn delete_category(&self, _id: Uuid) -> bool {
            false
        }
        async fn list_menu_items(
            &self,
            _category_id: Option<Uuid>,
            _available_only: bool,
        ) -> Vec<MenuItem> {
            vec![]
        }
        async fn get_menu_item(&self, _id: Uuid) -> Option<MenuItem> {
            None
        }
        async fn create_menu_item(
            &self,
            _req: CreateMenuItemRequest,
        ) -> Option<MenuItem> {
            None
        }
        async fn update_menu_item(
            &self,
            _id: Uuid,
            _req: UpdateMenuItemRequest,
        ) -> Option<MenuItem> {
            None
        }
        async fn set_menu_item_availability(
            &self,
            _id: Uuid,
            _is_available: bool,
        ) -> Option<MenuItem> {
            None
        }
        async fn delete_menu_item(&self, _id: Uuid) -> bool {
            false
        }
        async fn create_reservation(
            &self,
            _req: CreateReservationRequest,
        ) -> Option<Reservation> {
            None
        }
        async fn list_reservations(
            &self,
            _status: Option<ReservationStatus>,
        ) -> Vec<Reservation> {
            vec![]
        }
        async fn get_reservation(&self, _id: Uuid) -> Option<Reservation> {
            None
        }
        async fn update_reservation_status(
            &self,
            _id: Uuid,
            _status: ReservationStatus,
            _acted_by: &str,
        ) -> Option<Reservation> {
            None
        }
        async fn delete_reservation(&self, _id: Uuid) -> bool {
            false
        }
        async fn list_admin_users(&self) -> Vec<AdminUser> {
            vec![]
        }
        async fn get_admin_user(&self, _id: Uuid) -> Option<AdminUser> {
            None
        }
        async fn upsert_admin_user(
            &self,
            _id: Uuid,
            _email: &str,
            _role: &str,
        ) -> Option<AdminUser> {
            None
        }
        async fn get_stats(&self) -> DashboardStats {
            DashboardStats::default()
        }
    }

    #[tokio::test]
    async fn test_failed_role_write_removes_auth_user() {
        let identity = MockIdentityProvider::new();
        let user = identity
            .create_user("new.hire@venue.test", "long enough")
            .await
            .unwrap();

        let result = grant_role(
            &ReadOnlyRepo,
            &identity,
            user.id,
            "new.hire@venue.test",
            AdminRole::Employee,
        )
        .await;

        assert!(matches!(result, Err(CliError::Record(_))));
        assert!(identity.list_users().await.unwrap().is_empty());
        // The email is free again.
        assert!(identity
            .create_user("new.hire@venue.test", "long enough")
            .await
            .is_ok());
    }
}
