//! User directory: paginated listing and maintenance of user profiles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shared::generation::{GenerationTicket, RequestGeneration};
use shared::pagination::{PageInfo, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use shared::validation::normalize_filter;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AdminError, AdminResult};
use crate::models::{ListUsersQuery, Profile, UpdateUserRequest, UserPage, UserStatus, UserType};
use crate::query::ListQuery;
use crate::store::{
    decode_row, encode_row, Filter, SelectQuery, Store, StoreError, Table, WriteOp, WriteOutcome,
};

/// Conditional writes tried by [`UserDirectory::set_user_module`] before giving up.
const MODULE_TOGGLE_ATTEMPTS: usize = 3;

/// Columns matched by the free-text search.
pub const SEARCH_COLUMNS: &[&str] = &["name", "email"];

/// Listing and mutation of user profiles.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn Store>,
    default_page_size: u32,
    max_page_size: u32,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_page_limits(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    /// Compose the store query for a listing request.
    ///
    /// Type and status values that do not name a known variant are dropped
    /// with a warning rather than turned into a filter nothing matches.
    pub fn build_query(&self, query: &ListUsersQuery) -> AdminResult<ListQuery> {
        query.validate()?;
        let page = PageRequest::new(
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(self.default_page_size),
            self.max_page_size,
        )?;

        let user_type = parse_filter::<UserType>("user_type", query.user_type.as_deref());
        let status = parse_filter::<UserStatus>("status", query.status.as_deref());

        Ok(ListQuery::new(Table::Profiles)
            .search(SEARCH_COLUMNS, query.search.as_deref())
            .eq("user_type", user_type.map(|t| json!(t.as_str())))
            .eq("status", status.map(|s| json!(s.as_str())))
            .paginate(page))
    }

    /// One page of users matching every supplied filter, with the total match count.
    pub async fn list_users(&self, query: &ListUsersQuery) -> AdminResult<UserPage> {
        let list = self.build_query(query)?;
        let (users, total) = list.fetch::<Profile>(self.store.as_ref()).await?;
        Ok(UserPage {
            users,
            pagination: PageInfo::new(list.page(), total),
        })
    }

    pub async fn get_user(&self, id: Uuid) -> AdminResult<Profile> {
        let query = SelectQuery::new()
            .filter(Filter::Eq("id", json!(id.to_string())))
            .limit(1);
        let selection = self.store.select(Table::Profiles, &query).await?;
        match selection.rows.into_iter().next() {
            Some(row) => Ok(decode_row(Table::Profiles, row)?),
            None => Err(AdminError::not_found("User", id)),
        }
    }

    /// Apply a partial update, always stamping `updated_at`.
    pub async fn update_user(&self, id: Uuid, patch: &UpdateUserRequest) -> AdminResult<Profile> {
        self.update_user_at(id, patch, Utc::now()).await
    }

    pub async fn update_user_at(
        &self,
        id: Uuid,
        patch: &UpdateUserRequest,
        now: DateTime<Utc>,
    ) -> AdminResult<Profile> {
        patch.validate()?;
        let mut row = encode_row(Table::Profiles, patch)?;
        if let Value::Object(fields) = &mut row {
            fields.insert("updated_at".into(), json!(now));
        }

        let updated = self
            .store
            .update(Table::Profiles, &id.to_string(), row)
            .await
            .map_err(|e| user_error(id, e))?;

        info!(user_id = %id, "User updated");
        Ok(decode_row(Table::Profiles, updated)?)
    }

    pub async fn set_user_status(&self, id: Uuid, status: UserStatus) -> AdminResult<Profile> {
        let patch = UpdateUserRequest {
            status: Some(status),
            ..Default::default()
        };
        self.update_user(id, &patch).await
    }

    /// Enable or disable a module for a user.
    ///
    /// Enabling requires a known module slug; disabling accepts any slug so
    /// stale entries can always be removed. The write only applies if
    /// `enabled_modules` still holds the value that was read, and is retried
    /// when another writer got there first.
    pub async fn set_user_module(&self, id: Uuid, slug: &str, enabled: bool) -> AdminResult<Profile> {
        if enabled {
            let known = self
                .store
                .count(Table::PlatformModules, &[Filter::Eq("slug", json!(slug))])
                .await?;
            if known == 0 {
                return Err(AdminError::not_found("Module", slug));
            }
        }

        for attempt in 1..=MODULE_TOGGLE_ATTEMPTS {
            let user = self.get_user(id).await?;
            let mut modules = user.enabled_modules.clone();
            if enabled {
                if !modules.iter().any(|m| m == slug) {
                    modules.push(slug.to_string());
                }
            } else {
                modules.retain(|m| m != slug);
            }
            if modules == user.enabled_modules {
                return Ok(user);
            }

            let op = WriteOp::UpdateWhere {
                table: Table::Profiles,
                filters: vec![
                    Filter::Eq("id", json!(id.to_string())),
                    Filter::Eq("enabled_modules", json!(user.enabled_modules)),
                ],
                patch: json!({ "enabled_modules": modules, "updated_at": Utc::now() }),
            };
            let updated = self
                .store
                .execute_atomic(vec![op])
                .await?
                .into_iter()
                .flat_map(WriteOutcome::into_rows)
                .next();

            if let Some(row) = updated {
                info!(user_id = %id, module = slug, enabled, "User module toggled");
                return Ok(decode_row(Table::Profiles, row)?);
            }
            warn!(user_id = %id, attempt, "Enabled modules changed concurrently");
        }

        Err(AdminError::Conflict(format!(
            "Modules of user {} are being changed concurrently",
            id
        )))
    }

    /// Delete a user. Cached pages must be re-fetched afterwards.
    pub async fn delete_user(&self, id: Uuid) -> AdminResult<()> {
        self.store
            .delete(Table::Profiles, &id.to_string())
            .await
            .map_err(|e| user_error(id, e))?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

fn parse_filter<T: std::str::FromStr>(field: &str, value: Option<&str>) -> Option<T> {
    let value = normalize_filter(value)?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(field, value, "Ignoring unrecognized filter value");
            None
        }
    }
}

fn user_error(id: Uuid, err: StoreError) -> AdminError {
    match err {
        StoreError::NotFound { .. } => AdminError::not_found("User", id),
        other => other.into(),
    }
}

// ============================================================================
// Cached directory view
// ============================================================================

/// Outcome of completing a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh was started; the response was discarded.
    Stale,
}

/// Caller-side cache of the last listed page.
///
/// Every refresh is tagged with a generation; a response is applied only if
/// no newer refresh has started since, so the last request always wins. The
/// cache is only mutated after the store confirms a write.
pub struct UserDirectoryView {
    directory: UserDirectory,
    generation: RequestGeneration,
    query: ListUsersQuery,
    page: Option<UserPage>,
}

impl UserDirectoryView {
    pub fn new(directory: UserDirectory) -> Self {
        Self {
            directory,
            generation: RequestGeneration::new(),
            query: ListUsersQuery::default(),
            page: None,
        }
    }

    pub fn page(&self) -> Option<&UserPage> {
        self.page.as_ref()
    }

    pub fn query(&self) -> &ListUsersQuery {
        &self.query
    }

    /// Tag a new listing request. Any earlier ticket becomes stale.
    pub fn begin_refresh(&self) -> GenerationTicket {
        self.generation.begin()
    }

    /// Apply a listing response if its ticket is still the latest.
    pub fn complete_refresh(
        &mut self,
        ticket: GenerationTicket,
        query: ListUsersQuery,
        result: AdminResult<UserPage>,
    ) -> AdminResult<RefreshOutcome> {
        if !self.generation.is_current(ticket) {
            return Ok(RefreshOutcome::Stale);
        }
        let page = result?;
        self.query = query;
        self.page = Some(page);
        Ok(RefreshOutcome::Applied)
    }

    /// List with new filters and cache the page.
    pub async fn refresh(&mut self, query: ListUsersQuery) -> AdminResult<RefreshOutcome> {
        let ticket = self.begin_refresh();
        let result = self.directory.list_users(&query).await;
        self.complete_refresh(ticket, query, result)
    }

    /// Update a user and patch the cached row on success only.
    pub async fn update_user(&mut self, id: Uuid, patch: &UpdateUserRequest) -> AdminResult<Profile> {
        let updated = self.directory.update_user(id, patch).await?;
        if let Some(page) = self.page.as_mut() {
            if let Some(cached) = page.users.iter_mut().find(|u| u.id == id) {
                *cached = updated.clone();
            }
        }
        Ok(updated)
    }

    /// Delete a user, then re-run the current listing.
    pub async fn delete_user(&mut self, id: Uuid) -> AdminResult<()> {
        self.directory.delete_user(id).await?;
        let query = self.query.clone();
        self.refresh(query).await?;
        Ok(())
    }
}
