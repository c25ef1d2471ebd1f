//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the span and Sentry scope)
//! 4. CORS (storefront UI origin only)
//! 5. Security headers
//! 6. Rate limiting (per route group, governor)

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::{api_rate_limiter, checkout_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
