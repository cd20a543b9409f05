//! Subscription lifecycle.
//!
//! A user moves between `NoSubscription`, `Active(plan)` and `Cancelled(plan)`.
//! Reassignment cancels the current row and starts a new one. Both `assign`
//! and `cancel` run their writes as one atomic batch, and the store's
//! one-active-row-per-user constraint turns a lost race into a conflict.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AdminError, AdminResult};
use crate::models::{Plan, PlanStatus, Profile, Subscription};
use crate::store::{
    decode_row, decode_rows, encode_row, Filter, SelectQuery, Sort, Store, StoreError, Table,
    WriteOp, WriteOutcome,
};

/// Sole writer of subscription rows and of `Profile.plan_id`.
#[derive(Clone)]
pub struct SubscriptionManager {
    store: Arc<dyn Store>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The user's active subscription, if any.
    pub async fn get_subscription(&self, user_id: Uuid) -> AdminResult<Option<Subscription>> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("user_id", json!(user_id.to_string())))
            .filter(Filter::Eq("status", json!("active")))
            .limit(1);
        let selection = self.store.select(Table::Subscriptions, &query).await?;
        match selection.rows.into_iter().next() {
            Some(row) => Ok(Some(decode_row(Table::Subscriptions, row)?)),
            None => Ok(None),
        }
    }

    /// Every subscription row of the user, newest first.
    pub async fn history(&self, user_id: Uuid) -> AdminResult<Vec<Subscription>> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("user_id", json!(user_id.to_string())))
            .sort(Sort::desc("started_at"));
        let selection = self.store.select(Table::Subscriptions, &query).await?;
        Ok(decode_rows(Table::Subscriptions, selection.rows)?)
    }

    /// Put the user on `plan_id`, cancelling any current subscription.
    pub async fn assign(&self, user_id: Uuid, plan_id: Uuid) -> AdminResult<Subscription> {
        self.assign_at(user_id, plan_id, Utc::now()).await
    }

    pub async fn assign_at(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> AdminResult<Subscription> {
        let (user, plan) = tokio::try_join!(self.load_user(user_id), self.load_plan(plan_id))?;
        if plan.status != PlanStatus::Active {
            warn!(user_id = %user.id, plan_id = %plan.id, "Refused assignment to inactive plan");
            return Err(AdminError::Validation(format!(
                "Plan {} is not active",
                plan.slug
            )));
        }

        let subscription = Subscription::start(user_id, plan_id, now);
        let ops = vec![
            cancel_active_op(user_id, now),
            WriteOp::Insert {
                table: Table::Subscriptions,
                row: encode_row(Table::Subscriptions, &subscription)?,
            },
            WriteOp::Update {
                table: Table::Profiles,
                key: user_id.to_string(),
                patch: json!({ "plan_id": plan_id.to_string(), "updated_at": now }),
            },
        ];

        let outcomes = self.store.execute_atomic(ops).await.map_err(assign_error)?;
        let replaced = cancelled_rows(&outcomes);
        let stored = outcomes
            .into_iter()
            .nth(1)
            .and_then(WriteOutcome::into_row)
            .ok_or_else(|| AdminError::Backend("Store returned no inserted subscription".into()))?;
        let subscription: Subscription = decode_row(Table::Subscriptions, stored)?;

        info!(
            user_id = %user_id,
            plan_id = %plan_id,
            replaced,
            "Subscription assigned"
        );
        Ok(subscription)
    }

    /// Cancel the user's active subscription. A no-op when there is none.
    ///
    /// Returns the cancelled row when one existed.
    pub async fn cancel(&self, user_id: Uuid) -> AdminResult<Option<Subscription>> {
        self.cancel_at(user_id, Utc::now()).await
    }

    pub async fn cancel_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AdminResult<Option<Subscription>> {
        if self.get_subscription(user_id).await?.is_none() {
            return Ok(None);
        }

        let ops = vec![
            cancel_active_op(user_id, now),
            WriteOp::Update {
                table: Table::Profiles,
                key: user_id.to_string(),
                patch: json!({ "plan_id": Value::Null, "updated_at": now }),
            },
        ];
        let outcomes = self.store.execute_atomic(ops).await.map_err(|e| match e {
            StoreError::NotFound { .. } => AdminError::not_found("User", user_id),
            other => other.into(),
        })?;

        let cancelled = outcomes
            .into_iter()
            .next()
            .map(WriteOutcome::into_rows)
            .unwrap_or_default()
            .into_iter()
            .next();
        match cancelled {
            Some(row) => {
                info!(user_id = %user_id, "Subscription cancelled");
                Ok(Some(decode_row(Table::Subscriptions, row)?))
            }
            // Cancelled concurrently between the check and the batch.
            None => Ok(None),
        }
    }

    async fn load_user(&self, user_id: Uuid) -> AdminResult<Profile> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("id", json!(user_id.to_string())))
            .limit(1);
        let selection = self.store.select(Table::Profiles, &query).await?;
        match selection.rows.into_iter().next() {
            Some(row) => Ok(decode_row(Table::Profiles, row)?),
            None => Err(AdminError::not_found("User", user_id)),
        }
    }

    async fn load_plan(&self, plan_id: Uuid) -> AdminResult<Plan> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("id", json!(plan_id.to_string())))
            .limit(1);
        let selection = self.store.select(Table::Plans, &query).await?;
        match selection.rows.into_iter().next() {
            Some(row) => Ok(decode_row(Table::Plans, row)?),
            None => Err(AdminError::not_found("Plan", plan_id)),
        }
    }
}

fn cancel_active_op(user_id: Uuid, now: DateTime<Utc>) -> WriteOp {
    WriteOp::UpdateWhere {
        table: Table::Subscriptions,
        filters: vec![
            Filter::Eq("user_id", json!(user_id.to_string())),
            Filter::Eq("status", json!("active")),
        ],
        patch: json!({ "status": "cancelled", "cancelled_at": now }),
    }
}

fn cancelled_rows(outcomes: &[WriteOutcome]) -> usize {
    match outcomes.first() {
        Some(WriteOutcome::UpdatedMany(rows)) => rows.len(),
        _ => 0,
    }
}

fn assign_error(err: StoreError) -> AdminError {
    match err {
        StoreError::UniqueViolation(_) | StoreError::Serialization(_) => AdminError::Conflict(
            "Subscription was changed concurrently; retry the assignment".into(),
        ),
        other => other.into(),
    }
}
