//! Business logic services for storefront.
//!
//! # Services
//!
//! - `catalog` - Cached reads of products and storefront content
//! - `checkout` - Cash-on-delivery order placement
//! - `realtime` - Signed event publishing to the admin dashboard

pub mod catalog;
pub mod checkout;
pub mod realtime;
