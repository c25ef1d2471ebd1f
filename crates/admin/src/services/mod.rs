//! Business logic services for admin.
//!
//! # Services
//!
//! - `audit` - Fire-and-forget admin action log
//! - `media` - Image upload proxy to the media host

pub mod audit;
pub mod media;
