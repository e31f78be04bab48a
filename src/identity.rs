use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

/// IdentityUser
///
/// A user account as known to the hosted auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("auth provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("SUPABASE_SERVICE_ROLE_KEY is required for user management")]
    MissingServiceKey,

    #[error("{0}")]
    Simulated(String),
}

// 1. IdentityProvider Contract
/// IdentityProvider
///
/// The hosted auth provider, seen only through the calls this service makes. Handlers
/// and the operator CLI depend on this trait; tests use `MockIdentityProvider`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in. `Ok(None)` means the credentials were refused.
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<IdentityUser>, IdentityError>;

    /// Lists every auth user (requires the service role key).
    async fn list_users(&self) -> Result<Vec<IdentityUser>, IdentityError>;

    /// Creates a confirmed auth user (requires the service role key).
    async fn create_user(&self, email: &str, password: &str)
    -> Result<IdentityUser, IdentityError>;

    /// Deletes an auth user (requires the service role key). Used to roll back a
    /// half-finished staff account.
    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError>;
}

/// Page size used when listing auth users.
pub const USERS_PER_PAGE: usize = 1000;

/// Calls `fetch_page` with page numbers starting at 1 and concatenates the results,
/// stopping at the first page shorter than `per_page`.
pub async fn collect_pages<F, Fut, T, E>(per_page: usize, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch_page(page).await?;
        let done = batch.len() < per_page;
        all.extend(batch);
        if done {
            return Ok(all);
        }
        page += 1;
    }
}

/// IdentityState
///
/// Shared handle to the auth provider stored in `AppState`.
pub type IdentityState = Arc<dyn IdentityProvider>;

// 2. The Real Implementation (Supabase Auth)
/// SupabaseAuthClient
///
/// Talks to the Supabase Auth REST API (`/auth/v1`).
#[derive(Clone)]
pub struct SupabaseAuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

#[derive(Deserialize)]
struct SignInResponse {
    user: IdentityUser,
}

#[derive(Deserialize)]
struct ListUsersResponse {
    users: Vec<IdentityUser>,
}

impl SupabaseAuthClient {
    pub fn new(base_url: &str, anon_key: &str, service_role_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_role_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            config.supabase_service_role_key.clone(),
        )
    }

    fn service_key(&self) -> Result<&str, IdentityError> {
        self.service_role_key
            .as_deref()
            .ok_or(IdentityError::MissingServiceKey)
    }

    async fn rejected(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        IdentityError::Rejected { status, body }
    }

    async fn list_users_page(&self, page: usize) -> Result<Vec<IdentityUser>, IdentityError> {
        let key = self.service_key()?;
        let url = format!(
            "{}/auth/v1/admin/users?page={page}&per_page={USERS_PER_PAGE}",
            self.base_url
        );
        let response = self
            .client
            .get(url)
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body = response.json::<ListUsersResponse>().await?;
        Ok(body.users)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        // Supabase answers 400 for wrong email/password.
        if response.status() == reqwest::StatusCode::BAD_REQUEST
            || response.status() == reqwest::StatusCode::UNAUTHORIZED
        {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body = response.json::<SignInResponse>().await?;
        Ok(Some(body.user))
    }

    async fn list_users(&self) -> Result<Vec<IdentityUser>, IdentityError> {
        self.service_key()?;
        collect_pages(USERS_PER_PAGE, |page| self.list_users_page(page)).await
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let key = self.service_key()?;
        let url = format!("{}/auth/v1/admin/users", self.base_url);
        let response = self
            .client
            .post(url)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(response.json::<IdentityUser>().await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let key = self.service_key()?;
        let url = format!("{}/auth/v1/admin/users/{id}", self.base_url);
        let response = self
            .client
            .delete(url)
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockIdentityProvider
///
/// In-memory stand-in for the auth provider. Accounts are `(user, password)` pairs;
/// clones share the same account list.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    accounts: Arc<Mutex<Vec<(IdentityUser, String)>>>,
    /// When true, every call fails as if the provider were unreachable.
    pub should_fail: bool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            accounts: Arc::default(),
            should_fail: true,
        }
    }

    pub fn with_account(self, id: Uuid, email: &str, password: &str) -> Self {
        self.push_account(
            IdentityUser {
                id,
                email: Some(email.to_string()),
                created_at: None,
            },
            password,
        );
        self
    }

    fn push_account(&self, user: IdentityUser, password: &str) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.push((user, password.to_string()));
        }
    }

    fn snapshot(&self) -> Vec<(IdentityUser, String)> {
        self.accounts
            .lock()
            .map(|accounts| accounts.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), IdentityError> {
        if self.should_fail {
            return Err(IdentityError::Simulated(
                "Mock Identity Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        self.check()?;
        Ok(self
            .snapshot()
            .into_iter()
            .find(|(user, secret)| user.email.as_deref() == Some(email) && secret == password)
            .map(|(user, _)| user))
    }

    async fn list_users(&self) -> Result<Vec<IdentityUser>, IdentityError> {
        self.check()?;
        Ok(self.snapshot().into_iter().map(|(user, _)| user).collect())
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        self.check()?;
        if self
            .snapshot()
            .iter()
            .any(|(user, _)| user.email.as_deref() == Some(email))
        {
            return Err(IdentityError::Rejected {
                status: 422,
                body: "email already registered".to_string(),
            });
        }
        let user = IdentityUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            created_at: Some(Utc::now()),
        };
        self.push_account(user.clone(), password);
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        self.check()?;
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|e| IdentityError::Simulated(e.to_string()))?;
        let before = accounts.len();
        accounts.retain(|(user, _)| user.id != id);
        if accounts.len() == before {
            return Err(IdentityError::Rejected {
                status: 404,
                body: "user not found".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_pages_stops_at_short_page() {
        let mut calls = Vec::new();
        let all: Result<Vec<usize>, IdentityError> = collect_pages(2, |page| {
            calls.push(page);
            let batch = match page {
                1 => vec![1, 2],
                2 => vec![3, 4],
                _ => vec![5],
            };
            async move { Ok(batch) }
        })
        .await;

        assert_eq!(all.unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(calls, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_collect_pages_handles_exact_multiple() {
        let all: Result<Vec<u8>, IdentityError> = collect_pages(2, |page| async move {
            Ok(if page <= 2 { vec![0, 0] } else { vec![] })
        })
        .await;

        assert_eq!(all.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_collect_pages_propagates_errors() {
        let result: Result<Vec<u8>, IdentityError> = collect_pages(2, |page| async move {
            if page == 1 {
                Ok(vec![0, 0])
            } else {
                Err(IdentityError::Simulated("page 2 unavailable".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(IdentityError::Simulated(_))));
    }
}
