//! Domain models.

pub mod activity;
pub mod dashboard;
pub mod plan;
pub mod platform_module;
pub mod profile;
pub mod subscription;
pub mod system_setting;

pub use activity::{ActivityItem, ActivityKind, Order};
pub use dashboard::AdminStatsSnapshot;
pub use plan::{
    BillingCycle, CreatePlanRequest, Plan, PlanChange, PlanStatus, PlanSummary, UpdatePlanRequest,
};
pub use platform_module::{
    CreateModuleRequest, ModuleChange, ModuleStatus, ModuleSummary, PlatformModule,
    UpdateModuleRequest,
};
pub use profile::{ListUsersQuery, Profile, UpdateUserRequest, UserPage, UserStatus, UserType};
pub use subscription::{Subscription, SubscriptionStatus};
pub use system_setting::{SettingKind, SettingValue, SettingView, SystemSetting};
