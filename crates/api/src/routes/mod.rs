//! HTTP route handlers.

pub mod activity;
pub mod health;
pub mod modules;
pub mod plans;
pub mod settings;
pub mod stats;
pub mod subscriptions;
pub mod users;
