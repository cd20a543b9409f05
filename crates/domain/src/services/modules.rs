//! Feature module catalog.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AdminError, AdminResult};
use crate::models::{
    CreateModuleRequest, ModuleChange, ModuleStatus, ModuleSummary, PlatformModule,
    UpdateModuleRequest,
};
use crate::store::{decode_row, decode_rows, encode_row, Filter, SelectQuery, Sort, Store, StoreError, Table};

/// CRUD over feature modules with derived adoption counts.
#[derive(Clone)]
pub struct ModuleService {
    store: Arc<dyn Store>,
}

impl ModuleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All modules by `sort_order`, each with the number of users that enabled it.
    pub async fn list_modules(&self) -> AdminResult<Vec<ModuleSummary>> {
        let query = SelectQuery::new().sort(Sort::asc("sort_order"));
        let selection = self.store.select(Table::PlatformModules, &query).await?;
        let modules: Vec<PlatformModule> = decode_rows(Table::PlatformModules, selection.rows)?;

        let mut summaries = Vec::with_capacity(modules.len());
        for module in modules {
            let users_count = self.users_count(&module.slug).await?;
            summaries.push(ModuleSummary { module, users_count });
        }
        Ok(summaries)
    }

    /// Users whose `enabled_modules` contains `slug`.
    pub async fn users_count(&self, slug: &str) -> AdminResult<i64> {
        let filters = [Filter::Contains("enabled_modules", json!(slug))];
        Ok(self.store.count(Table::Profiles, &filters).await?)
    }

    pub async fn get_module(&self, id: Uuid) -> AdminResult<PlatformModule> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("id", json!(id.to_string())))
            .limit(1);
        let selection = self.store.select(Table::PlatformModules, &query).await?;
        match selection.rows.into_iter().next() {
            Some(row) => Ok(decode_row(Table::PlatformModules, row)?),
            None => Err(AdminError::not_found("Module", id)),
        }
    }

    pub async fn create_module(&self, request: CreateModuleRequest) -> AdminResult<ModuleChange> {
        if let Err(errors) = request.validate() {
            warn!(slug = %request.slug, "Rejected module creation");
            return Err(errors.into());
        }

        let module = request.into_module(Utc::now());
        let row = encode_row(Table::PlatformModules, &module)?;
        let stored = self.store.insert(Table::PlatformModules, row).await?;
        let module: PlatformModule = decode_row(Table::PlatformModules, stored)?;
        info!(module_id = %module.id, slug = %module.slug, "Module created");

        self.changed(Some(module)).await
    }

    /// Apply a partial update. A slug change is refused while any user has
    /// the module enabled, since profiles reference modules by slug.
    pub async fn update_module(
        &self,
        id: Uuid,
        mut request: UpdateModuleRequest,
    ) -> AdminResult<ModuleChange> {
        request.validate()?;
        if let Some(name) = request.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(slug) = request.slug.as_deref() {
            let current = self.get_module(id).await?;
            if slug != current.slug {
                self.ensure_unused(&current, "rename").await?;
            }
        }

        let mut patch = encode_row(Table::PlatformModules, &request)?;
        if let Value::Object(fields) = &mut patch {
            fields.insert("updated_at".into(), json!(Utc::now()));
        }
        let stored = self
            .store
            .update(Table::PlatformModules, &id.to_string(), patch)
            .await
            .map_err(|e| module_error(id, e))?;
        let module: PlatformModule = decode_row(Table::PlatformModules, stored)?;
        info!(module_id = %id, "Module updated");

        self.changed(Some(module)).await
    }

    pub async fn set_module_status(&self, id: Uuid, status: ModuleStatus) -> AdminResult<ModuleChange> {
        let request = UpdateModuleRequest {
            status: Some(status),
            ..Default::default()
        };
        self.update_module(id, request).await
    }

    /// Delete a module. Refused while any user has it enabled.
    pub async fn delete_module(&self, id: Uuid) -> AdminResult<ModuleChange> {
        let current = self.get_module(id).await?;
        self.ensure_unused(&current, "delete").await?;

        self.store
            .delete(Table::PlatformModules, &id.to_string())
            .await
            .map_err(|e| module_error(id, e))?;
        info!(module_id = %id, "Module deleted");

        self.changed(None).await
    }

    async fn ensure_unused(&self, module: &PlatformModule, action: &str) -> AdminResult<()> {
        let users = self.users_count(&module.slug).await?;
        if users > 0 {
            warn!(module_id = %module.id, slug = %module.slug, users, action, "Refused change to module in use");
            return Err(AdminError::Conflict(format!(
                "Module {} is enabled for {} users",
                module.slug, users
            )));
        }
        Ok(())
    }

    async fn changed(&self, module: Option<PlatformModule>) -> AdminResult<ModuleChange> {
        let modules = self.list_modules().await?;
        Ok(ModuleChange { module, modules })
    }
}

fn module_error(id: Uuid, err: StoreError) -> AdminError {
    match err {
        StoreError::NotFound { .. } => AdminError::not_found("Module", id),
        other => other.into(),
    }
}
