//! User profile domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::pagination::PageInfo;
use uuid::Uuid;
use validator::Validate;

/// Account type of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Superadmin,
    Business,
    Personal,
}

impl UserType {
    pub const ALL: [UserType; 3] = [UserType::Superadmin, UserType::Business, UserType::Personal];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Superadmin => "SUPERADMIN",
            UserType::Business => "BUSINESS",
            UserType::Personal => "PERSONAL",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUPERADMIN" => Ok(UserType::Superadmin),
            "BUSINESS" => Ok(UserType::Business),
            "PERSONAL" => Ok(UserType::Personal),
            _ => Err(format!("Invalid user type: {}", s)),
        }
    }
}

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// A platform user as seen by the admin console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub status: UserStatus,
    #[serde(default)]
    pub enabled_modules: Vec<String>,
    pub plan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Build a fresh profile; used by seeding and tests since signup is external.
    pub fn new(name: impl Into<String>, email: impl Into<String>, user_type: UserType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            user_type,
            status: UserStatus::Active,
            enabled_modules: Vec::new(),
            plan_id: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    pub fn has_module(&self, slug: &str) -> bool {
        self.enabled_modules.iter().any(|m| m == slug)
    }
}

/// Query parameters for the user directory.
///
/// `user_type` and `status` accept the sentinel `"all"` to mean no filter.
#[derive(Debug, Clone, Deserialize, Validate, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ListUsersQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, message = "Page size must be at least 1"))]
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub user_type: Option<String>,
    pub status: Option<String>,
}

impl ListUsersQuery {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// One page of the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserPage {
    pub users: Vec<Profile>,
    pub pagination: PageInfo,
}

impl UserPage {
    pub fn total(&self) -> i64 {
        self.pagination.total
    }
}

/// Partial update of a profile.
///
/// `plan_id` is deliberately absent: only the subscription lifecycle writes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_modules: Option<Vec<String>>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.user_type.is_none()
            && self.status.is_none()
            && self.enabled_modules.is_none()
    }

    /// Apply the patch to a cached copy of the profile.
    pub fn apply_to(&self, profile: &mut Profile, updated_at: DateTime<Utc>) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        if let Some(user_type) = self.user_type {
            profile.user_type = user_type;
        }
        if let Some(status) = self.status {
            profile.status = status;
        }
        if let Some(modules) = &self.enabled_modules {
            profile.enabled_modules = modules.clone();
        }
        profile.updated_at = updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_serialization() {
        assert_eq!(
            serde_json::to_string(&UserType::Superadmin).unwrap(),
            "\"SUPERADMIN\""
        );
        let parsed: UserType = serde_json::from_str("\"BUSINESS\"").unwrap();
        assert_eq!(parsed, UserType::Business);
    }

    #[test]
    fn test_user_type_from_str() {
        assert_eq!("personal".parse::<UserType>(), Ok(UserType::Personal));
        assert!("admin".parse::<UserType>().is_err());
    }

    #[test]
    fn test_user_status_from_str() {
        assert_eq!("Suspended".parse::<UserStatus>(), Ok(UserStatus::Suspended));
        assert!("deleted".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_profile_round_trips_through_row() {
        let mut profile = Profile::new("Ann", "ann@example.com", UserType::Business);
        profile.enabled_modules = vec!["crm".into()];
        let row = serde_json::to_value(&profile).unwrap();
        assert_eq!(row["user_type"], "BUSINESS");
        assert_eq!(row["status"], "active");
        let back: Profile = serde_json::from_value(row).unwrap();
        assert_eq!(back, profile);
        assert!(back.has_module("crm"));
    }

    #[test]
    fn test_update_request_skips_absent_fields() {
        let patch = UpdateUserRequest {
            status: Some(UserStatus::Suspended),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"status": "suspended"}));
        assert!(!patch.is_empty());
        assert!(UpdateUserRequest::default().is_empty());
    }

    #[test]
    fn test_update_request_validation() {
        let patch = UpdateUserRequest {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = UpdateUserRequest {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_update_request_accepts_generated_contacts() {
        use fake::faker::internet::en::SafeEmail;
        use fake::faker::name::en::Name;
        use fake::Fake;

        for _ in 0..20 {
            let patch = UpdateUserRequest {
                name: Some(Name().fake()),
                email: Some(SafeEmail().fake()),
                ..Default::default()
            };
            assert!(patch.validate().is_ok(), "{:?}", patch);
        }
    }

    #[test]
    fn test_apply_to_cached_profile() {
        let mut profile = Profile::new("Ann", "ann@example.com", UserType::Personal);
        let later = profile.updated_at + chrono::Duration::seconds(5);
        let patch = UpdateUserRequest {
            name: Some("Ann Lee".into()),
            ..Default::default()
        };
        patch.apply_to(&mut profile, later);
        assert_eq!(profile.name, "Ann Lee");
        assert_eq!(profile.updated_at, later);
        assert_eq!(profile.email, "ann@example.com");
    }
}
