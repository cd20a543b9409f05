//! Subscription plan catalog.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AdminError, AdminResult};
use crate::models::{CreatePlanRequest, Plan, PlanChange, PlanSummary, Subscription, UpdatePlanRequest};
use crate::store::{decode_row, decode_rows, encode_row, Filter, SelectQuery, Sort, Store, StoreError, Table};

/// CRUD over plans with derived subscriber counts.
///
/// Every mutation re-fetches the whole catalog so counts are never stale.
#[derive(Clone)]
pub struct PlanService {
    store: Arc<dyn Store>,
}

impl PlanService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All plans, cheapest first, each with its active subscriber count.
    ///
    /// Counts come from a single query over active subscriptions grouped
    /// in memory instead of one count per plan.
    pub async fn list_plans(&self) -> AdminResult<Vec<PlanSummary>> {
        let plans_query = SelectQuery::new().sort(Sort::asc("price"));
        let active_query = SelectQuery::new().filter(Filter::Eq("status", json!("active")));

        let (plans, active) = tokio::try_join!(
            self.store.select(Table::Plans, &plans_query),
            self.store.select(Table::Subscriptions, &active_query),
        )?;

        let plans: Vec<Plan> = decode_rows(Table::Plans, plans.rows)?;
        let active: Vec<Subscription> = decode_rows(Table::Subscriptions, active.rows)?;
        let counts = count_by_plan(&active);

        Ok(plans
            .into_iter()
            .map(|plan| PlanSummary {
                subscriber_count: counts.get(&plan.id).copied().unwrap_or(0),
                plan,
            })
            .collect())
    }

    /// Active subscriber count of one plan.
    pub async fn subscriber_count(&self, plan_id: Uuid) -> AdminResult<i64> {
        let filters = [
            Filter::Eq("plan_id", json!(plan_id.to_string())),
            Filter::Eq("status", json!("active")),
        ];
        Ok(self.store.count(Table::Subscriptions, &filters).await?)
    }

    pub async fn get_plan(&self, id: Uuid) -> AdminResult<Plan> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("id", json!(id.to_string())))
            .limit(1);
        let selection = self.store.select(Table::Plans, &query).await?;
        match selection.rows.into_iter().next() {
            Some(row) => Ok(decode_row(Table::Plans, row)?),
            None => Err(AdminError::not_found("Plan", id)),
        }
    }

    pub async fn create_plan(&self, request: CreatePlanRequest) -> AdminResult<PlanChange> {
        if let Err(errors) = request.validate() {
            warn!(slug = %request.slug, "Rejected plan creation");
            return Err(errors.into());
        }

        let plan = request.into_plan(Utc::now());
        let row = encode_row(Table::Plans, &plan)?;
        let stored = self.store.insert(Table::Plans, row).await?;
        let plan: Plan = decode_row(Table::Plans, stored)?;
        info!(plan_id = %plan.id, slug = %plan.slug, "Plan created");

        self.changed(Some(plan)).await
    }

    pub async fn update_plan(&self, id: Uuid, mut request: UpdatePlanRequest) -> AdminResult<PlanChange> {
        request.validate()?;
        if let Some(name) = request.name.as_mut() {
            *name = name.trim().to_string();
        }

        let mut patch = encode_row(Table::Plans, &request)?;
        if let Value::Object(fields) = &mut patch {
            fields.insert("updated_at".into(), json!(Utc::now()));
        }
        let stored = self
            .store
            .update(Table::Plans, &id.to_string(), patch)
            .await
            .map_err(|e| plan_error(id, e))?;
        let plan: Plan = decode_row(Table::Plans, stored)?;
        info!(plan_id = %id, "Plan updated");

        self.changed(Some(plan)).await
    }

    /// Delete a plan. Refused while any user is actively subscribed to it.
    pub async fn delete_plan(&self, id: Uuid) -> AdminResult<PlanChange> {
        let subscribers = self.subscriber_count(id).await?;
        if subscribers > 0 {
            warn!(plan_id = %id, subscribers, "Refused to delete plan with active subscribers");
            return Err(AdminError::Conflict(format!(
                "Plan {} has {} active subscribers",
                id, subscribers
            )));
        }

        self.store
            .delete(Table::Plans, &id.to_string())
            .await
            .map_err(|e| plan_error(id, e))?;
        info!(plan_id = %id, "Plan deleted");

        self.changed(None).await
    }

    async fn changed(&self, plan: Option<Plan>) -> AdminResult<PlanChange> {
        let plans = self.list_plans().await?;
        Ok(PlanChange { plan, plans })
    }
}

fn count_by_plan(subscriptions: &[Subscription]) -> HashMap<Uuid, i64> {
    let mut counts = HashMap::new();
    for sub in subscriptions.iter().filter(|s| s.is_active()) {
        *counts.entry(sub.plan_id).or_insert(0) += 1;
    }
    counts
}

fn plan_error(id: Uuid, err: StoreError) -> AdminError {
    match err {
        StoreError::NotFound { .. } => AdminError::not_found("Plan", id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionStatus;

    #[test]
    fn test_count_by_plan() {
        let pro = Uuid::new_v4();
        let free = Uuid::new_v4();
        let now = Utc::now();
        let mut cancelled = Subscription::start(Uuid::new_v4(), free, now);
        cancelled.status = SubscriptionStatus::Cancelled;

        let subs = vec![
            Subscription::start(Uuid::new_v4(), pro, now),
            Subscription::start(Uuid::new_v4(), pro, now),
            Subscription::start(Uuid::new_v4(), free, now),
            cancelled,
        ];
        let counts = count_by_plan(&subs);
        assert_eq!(counts.get(&pro), Some(&2));
        assert_eq!(counts.get(&free), Some(&1));
        assert_eq!(counts.get(&Uuid::new_v4()), None);
    }

    #[test]
    fn test_plan_error_mapping() {
        let id = Uuid::new_v4();
        let err = plan_error(
            id,
            StoreError::NotFound {
                table: Table::Plans,
                key: id.to_string(),
            },
        );
        assert_eq!(err, AdminError::not_found("Plan", id));

        let err = plan_error(id, StoreError::UniqueViolation("plans_slug_key".into()));
        assert!(matches!(err, AdminError::Conflict(_)));
    }
}
