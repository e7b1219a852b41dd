//! User account domain types.
//!
//! One logical account type covers all four roles. Role-specific data lives
//! in [`AccountProfile`], so a role is never stored separately from the
//! attributes it implies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::config::{ROLE_TAG_ADMIN, ROLE_TAG_ARTIST, ROLE_TAG_CUSTOMER, ROLE_TAG_STAFF};
use crate::errors::{AppError, AppResult};

/// Account roles. Each role is backed by its own store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Customer,
    Artist,
    Admin,
    Staff,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Customer,
        UserRole::Artist,
        UserRole::Admin,
        UserRole::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => ROLE_TAG_CUSTOMER,
            UserRole::Artist => ROLE_TAG_ARTIST,
            UserRole::Admin => ROLE_TAG_ADMIN,
            UserRole::Staff => ROLE_TAG_STAFF,
        }
    }

    /// Parse a role tag, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> AppResult<Self> {
        value.parse()
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| AppError::validation(format!("Invalid role: {}", s)))
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountProfile {
    Customer,
    Artist {
        artist_name: Option<String>,
        photo_url: Option<String>,
    },
    Admin,
    Staff,
}

impl AccountProfile {
    pub fn role(&self) -> UserRole {
        match self {
            AccountProfile::Customer => UserRole::Customer,
            AccountProfile::Artist { .. } => UserRole::Artist,
            AccountProfile::Admin => UserRole::Admin,
            AccountProfile::Staff => UserRole::Staff,
        }
    }

    /// Build the profile for `role`. Artist fields are dropped for other roles.
    pub fn for_role(role: UserRole, artist_name: Option<String>, photo_url: Option<String>) -> Self {
        match role {
            UserRole::Customer => AccountProfile::Customer,
            UserRole::Artist => AccountProfile::Artist {
                artist_name,
                photo_url,
            },
            UserRole::Admin => AccountProfile::Admin,
            UserRole::Staff => AccountProfile::Staff,
        }
    }
}

/// A persisted account. The id is only unique within the account's own store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub profile: AccountProfile,
}

impl UserAccount {
    pub fn role(&self) -> UserRole {
        self.profile.role()
    }

    pub fn artist_name(&self) -> Option<&str> {
        match &self.profile {
            AccountProfile::Artist { artist_name, .. } => artist_name.as_deref(),
            _ => None,
        }
    }

    pub fn photo_url(&self) -> Option<&str> {
        match &self.profile {
            AccountProfile::Artist { photo_url, .. } => photo_url.as_deref(),
            _ => None,
        }
    }

    /// Apply a merge patch. Password changes are handled by the caller,
    /// which owns hashing.
    pub fn apply_update(&mut self, update: &UserUpdate) {
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(first_name) = &update.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            self.last_name = last_name.clone();
        }
        if let AccountProfile::Artist {
            artist_name,
            photo_url,
        } = &mut self.profile
        {
            if let Some(name) = &update.artist_name {
                *artist_name = name.clone();
            }
            if let Some(url) = &update.photo_url {
                *photo_url = url.clone();
            }
        }
    }

    /// Case-insensitive substring match over the searchable text fields.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);

        contains(&self.username)
            || contains(&self.email)
            || self.first_name.as_deref().is_some_and(contains)
            || self.last_name.as_deref().is_some_and(contains)
            || self.artist_name().is_some_and(contains)
    }
}

/// Account data handed to a store for insertion. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile: AccountProfile,
}

impl NewAccount {
    /// Field checks every store applies before insertion.
    pub fn ensure_storable(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::validation("Username cannot be null or empty"));
        }
        if self.email.trim().is_empty() {
            return Err(AppError::validation("Email cannot be null or empty"));
        }
        Ok(())
    }

    pub fn into_account(self, id: i64, created_at: DateTime<Utc>) -> UserAccount {
        UserAccount {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            enabled: true,
            created_at,
            profile: self.profile,
        }
    }
}

/// Input for creating an account of any role.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "SecurePass123!")]
    pub password: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    /// One of CUSTOMER, ARTIST, ADMIN, STAFF (case-insensitive)
    #[schema(example = "CUSTOMER")]
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Artist accounts only
    pub artist_name: Option<String>,
    /// Artist accounts only
    pub photo_url: Option<String>,
}

/// Merge patch for an existing account.
///
/// Absent fields are left alone. For the nullable fields an explicit `null`
/// clears the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UserUpdate {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub last_name: Option<Option<String>>,
    /// Re-hashed when present and non-empty
    pub password: Option<String>,
    /// Ignored unless the account is an artist
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub artist_name: Option<Option<String>>,
    /// Ignored unless the account is an artist
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub photo_url: Option<Option<String>>,
}

impl UserUpdate {
    /// The new plaintext password, if the patch carries a non-empty one.
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Marks a field as present, keeping an explicit `null` as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Normalized account view returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserAccount> for UserResponse {
    fn from(account: UserAccount) -> Self {
        let role = account.role();
        let (artist_name, photo_url) = match account.profile {
            AccountProfile::Artist {
                artist_name,
                photo_url,
            } => (artist_name, photo_url),
            _ => (None, None),
        };

        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            role,
            artist_name,
            photo_url,
            enabled: account.enabled,
            created_at: account.created_at,
        }
    }
}

/// Account totals per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserCounts {
    pub customers: u64,
    pub artists: u64,
    pub admins: u64,
    pub staff: u64,
    pub total: u64,
}
