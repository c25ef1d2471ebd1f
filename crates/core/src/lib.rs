//! ZOLAR Core - Shared domain types.
//!
//! This crate provides the types used across every ZOLAR component:
//! - `storefront` - Public JSON API consumed by the storefront UI
//! - `admin` - Admin dashboard API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Checkout pricing lives here so it can be exercised
//! without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, phones, slugs and statuses
//! - [`checkout`] - Cart pricing and stock validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod types;

pub use types::*;
