use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(flatten)]
    pub personal: PersonalInfo,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Optional demographic details collected at registration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub country_of_residence: Option<String>,
    pub country_grew_up: Option<String>,
}

/// Everything needed to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub personal: PersonalInfo,
}

/// Partial account update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub personal: Option<PersonalInfo>,
}

impl User {
    /// Applies a partial update in place
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(hash) = changes.password_hash {
            self.password_hash = hash;
        }
        if let Some(personal) = changes.personal {
            self.personal = personal;
        }
    }
}
