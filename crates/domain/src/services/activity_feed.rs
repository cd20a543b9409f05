//! Recent activity feed.
//!
//! Merges the newest sign-ups and the newest orders into one stream ordered
//! by time, newest first.

use std::sync::Arc;

use tracing::debug;

use crate::error::AdminResult;
use crate::models::{ActivityItem, Order, Profile};
use crate::store::{decode_rows, SelectQuery, Sort, Store, Table};

/// Bounds of the feed: K1 user events, K2 order events, K merged items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    pub users: u64,
    pub orders: u64,
    pub total: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            users: 5,
            orders: 5,
            total: 8,
        }
    }
}

#[derive(Clone)]
pub struct ActivityFeed {
    store: Arc<dyn Store>,
    limits: FeedLimits,
}

impl ActivityFeed {
    pub fn new(store: Arc<dyn Store>, limits: FeedLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> FeedLimits {
        self.limits
    }

    pub async fn recent(&self) -> AdminResult<Vec<ActivityItem>> {
        let users_query = SelectQuery::new()
            .sort(Sort::desc("created_at"))
            .limit(self.limits.users);
        let orders_query = SelectQuery::new()
            .sort(Sort::desc("created_at"))
            .limit(self.limits.orders);

        let (users, orders) = tokio::try_join!(
            self.store.select(Table::Profiles, &users_query),
            self.store.select(Table::Orders, &orders_query),
        )?;
        let users: Vec<Profile> = decode_rows(Table::Profiles, users.rows)?;
        let orders: Vec<Order> = decode_rows(Table::Orders, orders.rows)?;

        let user_events = users
            .iter()
            .map(|u| ActivityItem::new_user(u.id, &u.name, u.created_at));
        let order_events = orders.iter().map(ActivityItem::order);

        let feed = merge_feed(user_events.chain(order_events).collect(), self.limits.total);
        debug!(items = feed.len(), "Built activity feed");
        Ok(feed)
    }
}

/// Sort newest first and keep the top `limit`.
///
/// Equal timestamps order user events before orders, then by id.
pub fn merge_feed(mut items: Vec<ActivityItem>, limit: usize) -> Vec<ActivityItem> {
    items.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then(a.kind.cmp(&b.kind))
            .then(a.id.cmp(&b.id))
    });
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn order_at(minutes_ago: i64) -> ActivityItem {
        ActivityItem::order(&Order {
            id: Uuid::new_v4(),
            buyer_name: "Buyer".into(),
            total: 10.0,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        })
    }

    #[test]
    fn test_merge_orders_by_time_descending() {
        let now = Utc::now();
        let items = vec![
            ActivityItem::new_user(Uuid::new_v4(), "a", now - Duration::minutes(1)),
            ActivityItem::new_user(Uuid::new_v4(), "b", now - Duration::minutes(5)),
            ActivityItem::new_user(Uuid::new_v4(), "c", now - Duration::minutes(9)),
            order_at(3),
            order_at(7),
        ];
        let feed = merge_feed(items, 5);
        assert_eq!(feed.len(), 5);
        assert!(feed.windows(2).all(|w| w[0].occurred_at > w[1].occurred_at));
        assert_eq!(
            feed.iter().map(|i| i.kind).collect::<Vec<_>>(),
            vec![
                ActivityKind::NewUser,
                ActivityKind::Order,
                ActivityKind::NewUser,
                ActivityKind::Order,
                ActivityKind::NewUser,
            ]
        );
    }

    #[test]
    fn test_merge_truncates() {
        let items = (0..6).map(order_at).collect();
        let feed = merge_feed(items, 4);
        assert_eq!(feed.len(), 4);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let at = Utc::now();
        let order = ActivityItem {
            id: Uuid::nil(),
            kind: ActivityKind::Order,
            title: "order".into(),
            occurred_at: at,
        };
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let second = ActivityItem::new_user(ids[1], "second", at);
        let first = ActivityItem::new_user(ids[0], "first", at);

        let feed = merge_feed(vec![order.clone(), second.clone(), first.clone()], 3);
        assert_eq!(feed, vec![first, second, order]);
    }
}
