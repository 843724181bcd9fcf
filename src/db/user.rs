//! User model for Cabinet.
//!
//! Users are owned by the identity system; this table mirrors only what the
//! file service needs (a stable id and an email for reports).

/// A user known to the file service.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Email address (unique).
    pub email: String,
    /// When the user row was created.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address.
    pub email: String,
}

impl NewUser {
    /// Create a new user with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}
