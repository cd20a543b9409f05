//! Global system setting models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared type of a setting and its value domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettingKind {
    Toggle,
    Text,
    Number,
    Select { options: Vec<String> },
}

impl SettingKind {
    pub fn name(&self) -> &'static str {
        match self {
            SettingKind::Toggle => "toggle",
            SettingKind::Text => "text",
            SettingKind::Number => "number",
            SettingKind::Select { .. } => "select",
        }
    }

    /// Check a value against this kind's domain.
    ///
    /// Numeric bounds are not checked here; callers owning the schema do that.
    pub fn accepts(&self, value: &SettingValue) -> Result<(), String> {
        match (self, value) {
            (SettingKind::Toggle, SettingValue::Toggle(_))
            | (SettingKind::Text, SettingValue::Text(_))
            | (SettingKind::Number, SettingValue::Number(_)) => Ok(()),
            (SettingKind::Select { options }, SettingValue::Text(choice)) => {
                if options.iter().any(|o| o == choice) {
                    Ok(())
                } else {
                    Err(format!(
                        "'{}' is not one of: {}",
                        choice,
                        options.join(", ")
                    ))
                }
            }
            (kind, value) => Err(format!(
                "expected a {} value, got {}",
                kind.name(),
                value.type_name()
            )),
        }
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Toggle(bool),
    Number(i64),
    Text(String),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Toggle(_) => "boolean",
            SettingValue::Number(_) => "integer",
            SettingValue::Text(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Toggle(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Toggle(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

/// A committed system setting row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SystemSetting {
    pub key: String,
    pub value: SettingValue,
    pub kind: SettingKind,
    pub category: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A setting as shown to the console: committed record plus effective value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingView {
    #[serde(flatten)]
    pub setting: SystemSetting,
    pub effective_value: SettingValue,
    pub pending: bool,
}
