use serde::Deserialize;

use super::domain::Role;
use super::password::MIN_PASSWORD_CHARS;
use crate::validate::{looks_like_email, trimmed};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
}

/// Self-service profile edit. `password` and `role` are not accepted here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

/// Registration input after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
}

pub fn validate_registration(request: RegisterRequest) -> Result<NewAccount, Vec<String>> {
    let mut errors = Vec::new();

    let name = trimmed(request.name);
    if name.is_none() {
        errors.push("Name is required".to_string());
    }
    let email = normalized_email(request.email, &mut errors);
    let password = check_password(request.password, &mut errors);

    let role = match trimmed(request.role) {
        None => Some(Role::default()),
        Some(raw) => {
            let parsed = Role::parse(&raw);
            if parsed.is_none() {
                errors.push("Role must be one of: admin, reviewer, admission_officer".to_string());
            }
            parsed
        }
    };

    match (name, email, password, role) {
        (Some(name), Some(email), Some(password), Some(role)) if errors.is_empty() => {
            Ok(NewAccount {
                name,
                email,
                password,
                role,
                department: trimmed(request.department),
            })
        }
        _ => Err(errors),
    }
}

/// Validated profile changes; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
}

pub fn validate_profile_update(update: ProfileUpdate) -> Result<ProfileChanges, Vec<String>> {
    let mut errors = Vec::new();

    if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        errors.push("Name cannot be empty".to_string());
    }
    let email = match update.email {
        Some(raw) => normalized_email(Some(raw), &mut errors),
        None => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ProfileChanges {
        name: trimmed(update.name),
        email,
        department: trimmed(update.department),
    })
}

/// Enforces the minimum length on a new password.
pub fn check_password(password: Option<String>, errors: &mut Vec<String>) -> Option<String> {
    match password.filter(|password| !password.is_empty()) {
        None => {
            errors.push("Password is required".to_string());
            None
        }
        Some(password) if password.chars().count() < MIN_PASSWORD_CHARS => {
            errors.push(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            ));
            None
        }
        Some(password) => Some(password),
    }
}

pub(crate) fn normalized_email(raw: Option<String>, errors: &mut Vec<String>) -> Option<String> {
    match trimmed(raw).map(|email| email.to_lowercase()) {
        None => {
            errors.push("Email is required".to_string());
            None
        }
        Some(email) if !looks_like_email(&email) => {
            errors.push("Please enter a valid email".to_string());
            None
        }
        Some(email) => Some(email),
    }
}
