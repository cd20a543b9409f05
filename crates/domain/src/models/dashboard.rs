//! Dashboard statistics models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::UserType;

/// Aggregated dashboard metrics computed on demand.
///
/// Each figure comes from an independent query; the values are not
/// guaranteed to reflect one instant when the data changes concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminStatsSnapshot {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users_today: i64,
    pub new_users_week: i64,
    pub total_revenue: f64,
    pub users_by_type: BTreeMap<UserType, i64>,
    pub generated_at: DateTime<Utc>,
}

impl AdminStatsSnapshot {
    pub fn users_by_type_total(&self) -> i64 {
        self.users_by_type.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serialization() {
        let mut by_type = BTreeMap::new();
        by_type.insert(UserType::Business, 3);
        by_type.insert(UserType::Personal, 6);
        let snapshot = AdminStatsSnapshot {
            total_users: 9,
            active_users: 7,
            new_users_today: 1,
            new_users_week: 2,
            total_revenue: 58.0,
            users_by_type: by_type,
            generated_at: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["users_by_type"]["BUSINESS"], 3);
        assert_eq!(json["total_revenue"], 58.0);
        assert_eq!(snapshot.users_by_type_total(), 9);
    }
}
