use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Role, User};

/// Account as exposed over HTTP; the password hash and reset digest never appear.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            department: user.department.clone(),
            is_active: user.is_active,
            last_login: user.last_login.map(|at| at.to_chrono()),
            created_at: user.created_at.to_chrono(),
            updated_at: user.updated_at.to_chrono(),
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginView {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTicketView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}
