/// Router Module Index
///
/// Routing is split by who may call a route. Public routes carry no guard; every
/// back-office route is wrapped individually with the guard wrapper for its role.

/// Routes accessible to anonymous visitors of the public site.
pub mod public;

/// Back-office routes under `/admin`, each wrapped by the admin access guard.
pub mod admin;
