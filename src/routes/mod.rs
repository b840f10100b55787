//! HTTP route handlers, grouped by surface: redirect path, the `/api/urls`
//! management surface, and the liveness probe.

pub mod health_check;
pub mod redirect;
pub mod urls;
