//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the span and Sentry scope)
//! 4. CORS (dashboard UI origin, when configured)
//! 5. Security headers
//!
//! Authentication is not a layer: handlers take one of the extractors in
//! [`auth`] so the required role is visible in each signature.

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireAdmin, RequireSuperAdmin, RequireWriter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
