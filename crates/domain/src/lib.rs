//! Domain layer for the admin console backend.
//!
//! This crate contains:
//! - Domain models (Profile, Plan, PlatformModule, Subscription, SystemSetting)
//! - The data store boundary (`Store`) and the listing query builder
//! - Business logic services (stats, directory, plans, modules, subscriptions,
//!   settings, activity feed)
//! - Domain error types

pub mod error;
pub mod models;
pub mod query;
pub mod services;
pub mod store;

pub use error::{AdminError, AdminResult};
