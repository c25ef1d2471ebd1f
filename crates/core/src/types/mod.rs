//! Core types for ZOLAR.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{Phone, PhoneError};
pub use price::{CurrencyCode, Price, PriceError};
pub use slug::{Slug, SlugError};
pub use status::*;
