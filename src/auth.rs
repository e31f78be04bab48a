use std::{fmt, str::FromStr};

use axum::http::{HeaderMap, header};
use chrono::Utc;
use cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::config::AppConfig;

/// AdminRole
///
/// The closed set of back-office roles. Anything outside this enumeration is not a
/// role, and a credential carrying one is treated as no credential at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AdminRole {
    /// Front-of-house staff: reservations and availability only.
    Employee,
    /// Manages menu and categories, may delete reservations.
    Admin,
    /// Everything an admin can do, plus back-office user management.
    SuperAdmin,
}

impl AdminRole {
    /// Default allow-set for privileged routes (everyone but `employee`).
    pub const PRIVILEGED: &'static [AdminRole] = &[AdminRole::Admin, AdminRole::SuperAdmin];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// AdminClaims
///
/// Wire payload of the admin session credential (HS256). The role travels as a
/// plain string and is only trusted after it parses into `AdminRole`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

/// AdminPrincipal
///
/// The identity asserted by a verified credential. Built fresh for every request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminPrincipal {
    pub user_id: String,
    pub email: String,
    pub role: AdminRole,
}

/// Why a presented credential was not accepted. Never leaves the guard.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("admin signing secret is not configured")]
    MissingSecret,
    #[error("token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("unrecognized role in credential: {0}")]
    UnknownRole(String),
}

/// AdminGuard
///
/// Verifies admin credentials presented in a cookie. Holds only immutable data (the
/// decoding key, validation rules and cookie name) so it is cheap to clone into
/// every route layer and safe to share between concurrent requests.
#[derive(Clone)]
pub struct AdminGuard {
    decoding_key: Option<DecodingKey>,
    validation: Validation,
    cookie_name: String,
}

impl AdminGuard {
    /// An empty secret yields a guard that rejects every credential.
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        let decoding_key =
            (!secret.is_empty()).then(|| DecodingKey::from_secret(secret.as_bytes()));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key,
            validation,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.admin_jwt_secret, config.admin_cookie_name.clone())
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// verify_principal
    ///
    /// Resolves the admin principal carried by the request's cookie, if any.
    ///
    /// A missing cookie and an invalid credential both yield `None`; only the latter
    /// is logged. This never panics and never mutates anything, so calling it twice
    /// on the same headers gives the same answer.
    pub fn verify_principal(&self, headers: &HeaderMap) -> Option<AdminPrincipal> {
        let Some(token) = read_cookie(headers, &self.cookie_name) else {
            tracing::debug!(cookie = %self.cookie_name, "no admin credential presented");
            return None;
        };

        match self.decode_token(&token) {
            Ok(principal) => Some(principal),
            Err(CredentialError::MissingSecret) => {
                tracing::error!("admin credential presented but no signing secret is configured");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected admin credential");
                None
            }
        }
    }

    /// Verifies signature and expiry, then parses the role through the closed enum.
    pub fn decode_token(&self, token: &str) -> Result<AdminPrincipal, CredentialError> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or(CredentialError::MissingSecret)?;

        let data = decode::<AdminClaims>(token, key, &self.validation)?;
        let AdminClaims {
            user_id,
            email,
            role,
            ..
        } = data.claims;

        let role = match role.parse::<AdminRole>() {
            Ok(role) => role,
            Err(_) => return Err(CredentialError::UnknownRole(role)),
        };

        Ok(AdminPrincipal {
            user_id,
            email,
            role,
        })
    }
}

/// issue_admin_token
///
/// Mints a signed credential for `principal` valid for `ttl_secs`. Used by the login
/// route and the operator CLI; the guard itself only verifies.
pub fn issue_admin_token(
    principal: &AdminPrincipal,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, CredentialError> {
    if secret.is_empty() {
        return Err(CredentialError::MissingSecret);
    }

    let now = unix_now();
    let claims = AdminClaims {
        user_id: principal.user_id.clone(),
        email: principal.email.clone(),
        role: principal.role.to_string(),
        iat: now,
        exp: now.saturating_add(ttl_secs),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Finds a non-empty cookie by name across every `Cookie` header.
/// Unparseable cookie pairs are skipped.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Builds the HttpOnly session cookie carrying a freshly issued credential.
pub fn session_cookie(name: &str, token: String, ttl_secs: u64, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((name.to_owned(), token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

/// Builds a cookie that overwrites and expires the session cookie.
pub fn logout_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_owned(), ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(0))
        .build()
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
