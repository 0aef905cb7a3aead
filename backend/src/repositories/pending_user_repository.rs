//! Database repository for provisional registrations.
//!
//! A pending row is keyed by email and overwritten on every registration
//! attempt, so repeated sign-ups never accumulate duplicates.

use crate::database::models::{CreatePendingUser, PendingUser};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct PendingUserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> PendingUserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates or overwrites the pending registration for an email.
    pub async fn upsert(&self, pending: CreatePendingUser) -> Result<PendingUser> {
        let pending = sqlx::query_as::<_, PendingUser>(
            r#"
            INSERT INTO pending_users (email, username, name, password_hash, phone, role, otp, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                username = excluded.username,
                name = excluded.name,
                password_hash = excluded.password_hash,
                phone = excluded.phone,
                role = excluded.role,
                otp = excluded.otp,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            RETURNING *
            "#,
        )
        .bind(pending.email)
        .bind(pending.username)
        .bind(pending.name)
        .bind(pending.password_hash)
        .bind(pending.phone)
        .bind(pending.role)
        .bind(pending.otp)
        .bind(pending.expires_at)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(pending)
    }

    /// Retrieves the pending registration for an email, if any.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<PendingUser>> {
        let pending =
            sqlx::query_as::<_, PendingUser>("SELECT * FROM pending_users WHERE email = ?")
                .bind(email)
                .fetch_optional(self.pool)
                .await?;

        Ok(pending)
    }

    /// Replaces the OTP and expiry on an existing pending registration.
    pub async fn update_otp(
        &self,
        email: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE pending_users SET otp = ?, expires_at = ? WHERE email = ?")
            .bind(otp)
            .bind(expires_at)
            .bind(email)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Removes the pending registration once promoted (or abandoned).
    pub async fn delete_by_email(&self, email: &str) -> Result<()> {
        sqlx::query("DELETE FROM pending_users WHERE email = ?")
            .bind(email)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
