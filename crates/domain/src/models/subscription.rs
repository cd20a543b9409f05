//! Subscription domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

/// Binding of a user to a plan.
///
/// At most one row per user is ever `Active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// A new active subscription starting at `now`.
    pub fn start(user_id: Uuid, plan_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            status: SubscriptionStatus::Active,
            started_at: now,
            cancelled_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_active() {
        let now = Utc::now();
        let sub = Subscription::start(Uuid::new_v4(), Uuid::new_v4(), now);
        assert!(sub.is_active());
        assert_eq!(sub.started_at, now);
        assert!(sub.cancelled_at.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let sub = Subscription::start(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        let row = serde_json::to_value(&sub).unwrap();
        assert_eq!(row["status"], "active");
        assert!(row["cancelled_at"].is_null());
        assert_eq!(SubscriptionStatus::Cancelled.as_str(), "cancelled");
    }
}
