//! Shared utilities and common types for the admin console backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Offset pagination math
//! - Common validation logic (slugs, filter sentinels)
//! - Request generation tracking for "last request wins" listings

pub mod generation;
pub mod pagination;
pub mod validation;
