//! Admin console services.
//!
//! Each service holds a handle to the [`Store`](crate::store::Store) and
//! returns [`AdminResult`](crate::error::AdminResult) from every operation.

pub mod activity_feed;
pub mod modules;
pub mod plans;
pub mod settings;
pub mod stats;
pub mod subscriptions;
pub mod user_directory;

pub use activity_feed::{merge_feed, ActivityFeed, FeedLimits};
pub use modules::ModuleService;
pub use plans::PlanService;
pub use settings::{CommitError, SettingsStore, DEFAULT_SAVED_FLASH_SECS};
pub use stats::StatsAggregator;
pub use subscriptions::SubscriptionManager;
pub use user_directory::{RefreshOutcome, UserDirectory, UserDirectoryView};
