//! Global settings with a pending-change overlay.
//!
//! Committed values are loaded once into memory. Edits go into a separate
//! overlay and only reach the store on [`SettingsStore::commit`]. Reads
//! resolve the overlay first, then the committed value.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{AdminError, AdminResult};
use crate::models::{SettingValue, SettingView, SystemSetting};
use crate::store::{decode_row, decode_rows, SelectQuery, Sort, Store, StoreError, Table};

/// How long the "saved" indicator stays up after a commit.
pub const DEFAULT_SAVED_FLASH_SECS: i64 = 3;

/// A commit that stopped partway.
///
/// Keys in `persisted` reached the store and are now committed locally; the
/// failing key and every key after it remain pending.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Settings commit failed after {} key(s) were saved: {source}", persisted.len())]
pub struct CommitError {
    pub persisted: Vec<String>,
    pub source: AdminError,
}

impl From<CommitError> for AdminError {
    fn from(err: CommitError) -> Self {
        err.source
    }
}

/// Two-layer settings store: committed map plus pending overlay.
pub struct SettingsStore {
    store: Arc<dyn Store>,
    committed: BTreeMap<String, SystemSetting>,
    pending: BTreeMap<String, SettingValue>,
    saved_at: Option<DateTime<Utc>>,
    saved_flash: Duration,
}

impl SettingsStore {
    /// Load every committed setting.
    pub async fn load(store: Arc<dyn Store>) -> AdminResult<Self> {
        let mut settings = Self {
            store,
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
            saved_at: None,
            saved_flash: Duration::seconds(DEFAULT_SAVED_FLASH_SECS),
        };
        settings.reload().await?;
        Ok(settings)
    }

    pub fn with_saved_flash(mut self, saved_flash: Duration) -> Self {
        self.saved_flash = saved_flash;
        self
    }

    /// Re-read committed values from the store. Pending edits are kept.
    pub async fn reload(&mut self) -> AdminResult<()> {
        let query = SelectQuery::new().sort(Sort::asc("key"));
        let selection = self.store.select(Table::SystemSettings, &query).await?;
        let rows: Vec<SystemSetting> = decode_rows(Table::SystemSettings, selection.rows)?;
        self.committed = rows.into_iter().map(|s| (s.key.clone(), s)).collect();
        info!(count = self.committed.len(), "Loaded system settings");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&SystemSetting> {
        self.committed.get(key)
    }

    /// Effective value: pending edit if any, else the committed value.
    pub fn get_value(&self, key: &str) -> Option<&SettingValue> {
        self.pending
            .get(key)
            .or_else(|| self.committed.get(key).map(|s| &s.value))
    }

    /// Stage an edit after checking it against the setting's declared kind.
    pub fn set_change(&mut self, key: &str, value: SettingValue) -> AdminResult<()> {
        let setting = self
            .committed
            .get(key)
            .ok_or_else(|| AdminError::not_found("Setting", key))?;

        if let Err(reason) = setting.kind.accepts(&value) {
            warn!(key, %reason, "Rejected setting change");
            return Err(AdminError::Validation(format!("Setting {}: {}", key, reason)));
        }

        self.pending.insert(key.to_string(), value);
        self.saved_at = None;
        Ok(())
    }

    /// Drop the pending edit for `key`. Returns whether one existed.
    pub fn discard(&mut self, key: &str) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn discard_all(&mut self) {
        self.pending.clear();
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_keys(&self) -> Vec<&str> {
        self.pending.keys().map(String::as_str).collect()
    }

    fn view(&self, setting: &SystemSetting) -> SettingView {
        let pending = self.pending.get(&setting.key);
        SettingView {
            setting: setting.clone(),
            effective_value: pending.unwrap_or(&setting.value).clone(),
            pending: pending.is_some(),
        }
    }

    /// Every setting with its effective value, ordered by key.
    pub fn views(&self) -> Vec<SettingView> {
        self.committed.values().map(|s| self.view(s)).collect()
    }

    /// Settings grouped by category, each resolved through the overlay.
    pub fn by_category(&self) -> BTreeMap<String, Vec<SettingView>> {
        let mut groups: BTreeMap<String, Vec<SettingView>> = BTreeMap::new();
        for setting in self.committed.values() {
            groups
                .entry(setting.category.clone())
                .or_default()
                .push(self.view(setting));
        }
        groups
    }

    /// Whether the "saved" indicator is showing at `now`.
    pub fn is_saved_at(&self, now: DateTime<Utc>) -> bool {
        self.saved_at
            .map(|saved| now - saved < self.saved_flash)
            .unwrap_or(false)
    }

    pub fn is_saved(&self) -> bool {
        self.is_saved_at(Utc::now())
    }

    /// Persist every pending edit, one key at a time.
    ///
    /// There is no rollback: on failure the keys written so far stay written.
    /// Returns the keys that were persisted.
    pub async fn commit(&mut self) -> Result<Vec<String>, CommitError> {
        self.commit_at(Utc::now()).await
    }

    pub async fn commit_at(&mut self, now: DateTime<Utc>) -> Result<Vec<String>, CommitError> {
        let keys: Vec<String> = self.pending.keys().cloned().collect();
        let mut persisted = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(value) = self.pending.get(&key).cloned() else {
                continue;
            };
            let patch = json!({ "value": value, "updated_at": now });

            let result = self
                .store
                .update(Table::SystemSettings, &key, patch)
                .await
                .and_then(|row| decode_row::<SystemSetting>(Table::SystemSettings, row));

            match result {
                Ok(setting) => {
                    self.committed.insert(key.clone(), setting);
                    self.pending.remove(&key);
                    persisted.push(key);
                }
                Err(err) => {
                    warn!(
                        key = %key,
                        persisted = persisted.len(),
                        error = %err,
                        "Settings commit stopped partway"
                    );
                    return Err(CommitError {
                        persisted,
                        source: setting_error(&key, err),
                    });
                }
            }
        }

        if !persisted.is_empty() {
            self.saved_at = Some(now);
            info!(count = persisted.len(), "Settings committed");
        }
        Ok(persisted)
    }
}

fn setting_error(key: &str, err: StoreError) -> AdminError {
    match err {
        StoreError::NotFound { .. } => AdminError::not_found("Setting", key),
        other => other.into(),
    }
}
