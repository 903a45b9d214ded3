//! User model
//!
//! This module defines the User entity and related types for the Foodgram service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
///
/// Users author recipes, keep favourites and shopping carts, and follow
/// other users. Staff accounts (`UserRole::Admin`) may also manage tags,
/// ingredients and the admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique, used to log in)
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// Note: The password should already be hashed before calling this function.
    /// Use `services::password::hash_password()` to hash the password.
    pub fn new(
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        password_hash: String,
        role: UserRole,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            first_name,
            last_name,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }

    /// Check if the user is staff
    pub fn is_staff(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Staff account
    Admin,
    /// Regular account
    #[default]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Default)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// User role (optional, defaults to User)
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User::new(
            "cook".to_string(),
            "cook@example.com".to_string(),
            "Ann".to_string(),
            "Smith".to_string(),
            "hash".to_string(),
            role,
        )
    }

    #[test]
    fn test_user_new() {
        let user = user(UserRole::User);

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "cook");
        assert_eq!(user.first_name, "Ann");
        assert_eq!(user.role, UserRole::User);
    }

    #[test]
    fn test_user_is_staff() {
        assert!(user(UserRole::Admin).is_staff());
        assert!(!user(UserRole::User).is_staff());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(UserRole::User)).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("USER").unwrap(), UserRole::User);
        assert!(UserRole::from_str("editor").is_err());
        assert_eq!(UserRole::default(), UserRole::User);
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }
}
