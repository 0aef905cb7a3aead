//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these may differ from API-specific models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use validator::Validate;

/// Role assigned to a verified user, stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::User => "user",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "user" => Ok(Role::User),
            _ => Err(format!("Invalid role: {}", input)),
        }
    }
}

/// A verified user account. Created only by OTP-confirmed registration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    /// Password-reset OTP, set by the forgot-password flow.
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub id: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Username must be between 1-255 characters"
    ))]
    pub username: String,

    pub name: Option<String>,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password hash is required"))]
    pub password_hash: String,

    pub phone: Option<String>,

    pub role: Role,
}

#[derive(Debug, Clone, Validate)]
pub struct CreatePendingUser {
    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Username must be between 1-255 characters"
    ))]
    pub username: String,

    pub name: Option<String>,

    #[validate(length(min = 1, message = "Password hash is required"))]
    pub password_hash: String,

    pub phone: Option<String>,

    pub role: Role,

    #[validate(length(min = 1, message = "OTP is required"))]
    pub otp: String,

    pub expires_at: DateTime<Utc>,
}

/// A provisional registration awaiting OTP confirmation, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingUser {
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Per-day aggregate row read by the dashboard endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Metric {
    pub date: NaiveDate,
    pub total_users: i64,
    pub total_sales: i64,
    pub total_conversions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Staff, Role::User] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::from_str("Admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("STAFF").unwrap(), Role::Staff);
    }
}
