use std::fmt;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Staff role carried in the token and checked by role gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Reviewer,
    AdmissionOfficer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Reviewer, Role::AdmissionOfficer];

    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reviewer => "reviewer",
            Role::AdmissionOfficer => "admission_officer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|role| role.label() == raw)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored staff account. `password_hash` is an argon2 PHC string and never leaves
/// the service; responses go through `UserView`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<bson::DateTime>,
    /// SHA-256 hex digest of the outstanding reset token.
    #[serde(default)]
    pub password_reset_token: Option<String>,
    #[serde(default)]
    pub password_reset_expires: Option<bson::DateTime>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn clear_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }
}
