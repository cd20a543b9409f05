//! Dashboard statistics aggregation.
//!
//! Issues a fixed set of independent count queries plus the revenue query
//! concurrently and merges them into one [`AdminStatsSnapshot`]. If any query
//! fails the whole snapshot fails; partial results are never returned.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AdminResult;
use crate::models::{AdminStatsSnapshot, Plan, Subscription, UserType};
use crate::store::{decode_rows, Filter, SelectQuery, Store, Table};

/// Computes dashboard metrics from the store.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn Store>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Snapshot relative to the current time.
    pub async fn snapshot(&self) -> AdminResult<AdminStatsSnapshot> {
        self.snapshot_at(Utc::now()).await
    }

    /// Snapshot with "today" and "this week" anchored at `now`.
    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> AdminResult<AdminStatsSnapshot> {
        let today = start_of_day(now);
        let week_ago = now - Duration::days(7);

        let (
            total_users,
            active_users,
            new_users_today,
            new_users_week,
            superadmins,
            business,
            personal,
            total_revenue,
        ) = tokio::try_join!(
            self.count_profiles(Vec::new()),
            self.count_profiles(vec![Filter::Eq("status", json!("active"))]),
            self.count_profiles(vec![Filter::Gte("created_at", today)]),
            self.count_profiles(vec![Filter::Gte("created_at", week_ago)]),
            self.count_profiles(vec![type_filter(UserType::Superadmin)]),
            self.count_profiles(vec![type_filter(UserType::Business)]),
            self.count_profiles(vec![type_filter(UserType::Personal)]),
            self.total_revenue(),
        )?;

        let users_by_type = BTreeMap::from([
            (UserType::Superadmin, superadmins),
            (UserType::Business, business),
            (UserType::Personal, personal),
        ]);

        debug!(total_users, active_users, total_revenue, "Computed admin stats");

        Ok(AdminStatsSnapshot {
            total_users,
            active_users,
            new_users_today,
            new_users_week,
            total_revenue,
            users_by_type,
            generated_at: now,
        })
    }

    async fn count_profiles(&self, filters: Vec<Filter>) -> AdminResult<i64> {
        Ok(self.store.count(Table::Profiles, &filters).await?)
    }

    /// Sum of plan prices over every active subscription.
    ///
    /// Plans are fetched once with an `In` filter rather than per subscription.
    pub async fn total_revenue(&self) -> AdminResult<f64> {
        let active = SelectQuery::new().filter(Filter::Eq("status", json!("active")));
        let selection = self.store.select(Table::Subscriptions, &active).await?;
        let subscriptions: Vec<Subscription> = decode_rows(Table::Subscriptions, selection.rows)?;
        if subscriptions.is_empty() {
            return Ok(0.0);
        }

        let plan_ids: HashSet<Uuid> = subscriptions.iter().map(|s| s.plan_id).collect();
        let plan_query = SelectQuery::new().filter(Filter::In(
            "id",
            plan_ids.iter().map(|id| Value::String(id.to_string())).collect(),
        ));
        let selection = self.store.select(Table::Plans, &plan_query).await?;
        let plans: Vec<Plan> = decode_rows(Table::Plans, selection.rows)?;
        let prices: HashMap<Uuid, f64> = plans.into_iter().map(|p| (p.id, p.price)).collect();

        Ok(sum_prices(&subscriptions, &prices))
    }
}

fn type_filter(user_type: UserType) -> Filter {
    Filter::Eq("user_type", json!(user_type.as_str()))
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::default()))
}

fn sum_prices(subscriptions: &[Subscription], prices: &HashMap<Uuid, f64>) -> f64 {
    subscriptions
        .iter()
        .map(|sub| match prices.get(&sub.plan_id) {
            Some(price) => *price,
            None => {
                warn!(subscription_id = %sub.id, plan_id = %sub.plan_id, "Active subscription references missing plan");
                0.0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 17, 42, 9).unwrap();
        assert_eq!(
            start_of_day(now),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
        let midnight = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(start_of_day(midnight), midnight);
    }

    #[test]
    fn test_sum_prices_counts_each_subscription() {
        let pro = Uuid::new_v4();
        let enterprise = Uuid::new_v4();
        let now = Utc::now();
        let subs = vec![
            Subscription::start(Uuid::new_v4(), pro, now),
            Subscription::start(Uuid::new_v4(), pro, now),
            Subscription::start(Uuid::new_v4(), enterprise, now),
        ];
        let prices = HashMap::from([(pro, 29.0), (enterprise, 99.0)]);
        assert_eq!(sum_prices(&subs, &prices), 157.0);
    }

    #[test]
    fn test_sum_prices_ignores_missing_plan() {
        let subs = vec![Subscription::start(Uuid::new_v4(), Uuid::new_v4(), Utc::now())];
        assert_eq!(sum_prices(&subs, &HashMap::new()), 0.0);
    }
}
