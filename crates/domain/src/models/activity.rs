//! Activity feed models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized kind of a feed event.
///
/// Variant order is the tie-break order for events sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    NewUser,
    Order,
}

/// A marketplace order, as far as the feed is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Order {
    pub id: Uuid,
    pub buyer_name: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// One entry of the merged feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivityItem {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityItem {
    pub fn new_user(id: Uuid, name: &str, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: ActivityKind::NewUser,
            title: format!("{} signed up", name),
            occurred_at,
        }
    }

    pub fn order(order: &Order) -> Self {
        Self {
            id: order.id,
            kind: ActivityKind::Order,
            title: format!("{} placed an order of {:.2}", order.buyer_name, order.total),
            occurred_at: order.created_at,
        }
    }
}
