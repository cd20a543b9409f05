//! Feature module domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Visibility state of a feature module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    #[default]
    Active,
    Inactive,
    Beta,
}

/// A feature module of the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlatformModule {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub status: ModuleStatus,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A module with the number of users that enabled it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModuleSummary {
    #[serde(flatten)]
    pub module: PlatformModule,
    pub users_count: i64,
}

/// Request to create a module.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateModuleRequest {
    #[validate(custom(function = "shared::validation::validate_name"))]
    pub name: String,
    #[validate(custom(function = "shared::validation::validate_slug"))]
    pub slug: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub status: ModuleStatus,
    #[serde(default)]
    pub sort_order: i32,
}

impl CreateModuleRequest {
    pub fn into_module(self, now: DateTime<Utc>) -> PlatformModule {
        PlatformModule {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            slug: self.slug,
            description: self.description,
            icon: self.icon,
            color: self.color,
            status: self.status,
            sort_order: self.sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a module.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateModuleRequest {
    #[validate(custom(function = "shared::validation::validate_name"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(custom(function = "shared::validation::validate_slug"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ModuleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

/// Result of a module mutation: the written module and the refreshed list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ModuleChange {
    pub module: Option<PlatformModule>,
    pub modules: Vec<ModuleSummary>,
}
