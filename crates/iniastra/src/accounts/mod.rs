//! Staff accounts: argon2 password storage, JWT sessions, role gates, and the
//! hashed one-time password reset flow.

pub mod domain;
pub mod password;
pub mod repository;
pub mod reset;
pub mod router;
pub mod service;
pub mod token;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{Role, User};
pub use repository::UserRepository;
pub use router::account_router;
pub use service::{AccountError, AccountService, ResetTicket, Session};
pub use token::{Claims, TokenAuthority, TokenError};
pub use validation::{
    ChangePasswordRequest, LoginRequest, ProfileUpdate, RegisterRequest, ResetPasswordRequest,
};
pub use views::{LoginView, ResetTicketView, UserView};
