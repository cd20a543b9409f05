//! Subscription plan domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Billing cycle of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Yearly,
}

/// Whether a plan can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Active,
    Inactive,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Inactive => "inactive",
        }
    }
}

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: f64,
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub modules_included: Vec<String>,
    pub max_storage_gb: i32,
    pub is_highlighted: bool,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A plan with its derived subscriber count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanSummary {
    #[serde(flatten)]
    pub plan: Plan,
    pub subscriber_count: i64,
}

/// Request to create a plan.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreatePlanRequest {
    #[validate(custom(function = "shared::validation::validate_name"))]
    pub name: String,
    #[validate(custom(function = "shared::validation::validate_slug"))]
    pub slug: String,
    #[validate(custom(function = "shared::validation::validate_price"))]
    pub price: f64,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub modules_included: Vec<String>,
    #[validate(range(min = 0, message = "Storage must be non-negative"))]
    #[serde(default)]
    pub max_storage_gb: i32,
    #[serde(default)]
    pub is_highlighted: bool,
    #[serde(default)]
    pub status: PlanStatus,
}

impl CreatePlanRequest {
    pub fn into_plan(self, now: DateTime<Utc>) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            slug: self.slug,
            price: self.price,
            billing_cycle: self.billing_cycle,
            features: self.features,
            modules_included: self.modules_included,
            max_storage_gb: self.max_storage_gb,
            is_highlighted: self.is_highlighted,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a plan.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdatePlanRequest {
    #[validate(custom(function = "shared::validation::validate_name"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(custom(function = "shared::validation::validate_slug"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[validate(custom(function = "crate::models::plan::validate_optional_price"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules_included: Option<Vec<String>>,
    #[validate(range(min = 0, message = "Storage must be non-negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_storage_gb: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_highlighted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
}

/// Validates optional price.
pub fn validate_optional_price(price: f64) -> Result<(), validator::ValidationError> {
    shared::validation::validate_price(price)
}

/// Result of a plan mutation: the written plan and the refreshed catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanChange {
    pub plan: Option<Plan>,
    pub plans: Vec<PlanSummary>,
}
