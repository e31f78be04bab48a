use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use serde_json::json;

use crate::auth::{AdminGuard, AdminPrincipal, AdminRole};

/// GuardRejection
///
/// The two ways a guarded route refuses a request. "No valid session" and "session
/// not privileged enough" are kept apart so each can be tested on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// No principal could be resolved (401).
    Unauthorized,
    /// A principal exists but its role is outside the allow-set (403).
    InsufficientPermissions,
}

impl GuardRejection {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::InsufficientPermissions => "Insufficient permissions",
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

/// authorize
///
/// The wrapper-side decision. `allowed = None` accepts any role.
pub fn authorize(
    principal: Option<AdminPrincipal>,
    allowed: Option<&[AdminRole]>,
) -> Result<AdminPrincipal, GuardRejection> {
    let principal = principal.ok_or(GuardRejection::Unauthorized)?;
    match allowed {
        Some(roles) if !roles.contains(&principal.role) => {
            Err(GuardRejection::InsufficientPermissions)
        }
        _ => Ok(principal),
    }
}

/// AccessPolicy
///
/// A guard paired with the roles a route accepts. This is the state handed to the
/// `enforce_access` middleware.
#[derive(Clone)]
pub struct AccessPolicy {
    guard: AdminGuard,
    allowed: Option<Arc<[AdminRole]>>,
}

impl AccessPolicy {
    pub fn any_admin(guard: AdminGuard) -> Self {
        Self {
            guard,
            allowed: None,
        }
    }

    /// An empty `allowed` slice denies every principal.
    pub fn roles(guard: AdminGuard, allowed: &[AdminRole]) -> Self {
        Self {
            guard,
            allowed: Some(Arc::from(allowed)),
        }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<AdminPrincipal, GuardRejection> {
        authorize(self.guard.verify_principal(headers), self.allowed.as_deref())
    }
}

/// enforce_access
///
/// Middleware that runs the guard before the wrapped handler. On success the
/// principal is attached to the request extensions and the handler runs once; on
/// failure the rejection is returned and the handler never runs.
pub async fn enforce_access(
    State(policy): State<AccessPolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    match policy.check(request.headers()) {
        Ok(principal) => {
            tracing::debug!(
                user_id = %principal.user_id,
                role = %principal.role,
                "admin access granted"
            );
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(rejection) => {
            tracing::debug!(
                uri = %request.uri(),
                status = %rejection.status(),
                "admin access denied"
            );
            rejection.into_response()
        }
    }
}

/// Wraps `handler` so it only runs for a request carrying any valid admin credential.
pub fn require_any_admin<S>(guard: &AdminGuard, handler: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    handler.route_layer(middleware::from_fn_with_state(
        AccessPolicy::any_admin(guard.clone()),
        enforce_access,
    ))
}

/// Wraps `handler` so it only runs for a valid credential whose role is in `allowed`.
pub fn require_role<S>(
    guard: &AdminGuard,
    allowed: &[AdminRole],
    handler: MethodRouter<S>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    handler.route_layer(middleware::from_fn_with_state(
        AccessPolicy::roles(guard.clone(), allowed),
        enforce_access,
    ))
}

/// `require_role` with the default allow-set (`admin`, `super_admin`).
pub fn require_privileged<S>(guard: &AdminGuard, handler: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    require_role(guard, AdminRole::PRIVILEGED, handler)
}

/// Hands guarded handlers the principal attached by `enforce_access`.
/// A handler mounted without a guard wrapper is rejected with 401.
impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminPrincipal>()
            .cloned()
            .ok_or(GuardRejection::Unauthorized)
    }
}
