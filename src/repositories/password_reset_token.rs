use chrono::{Duration, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::PasswordResetToken;

#[derive(Clone)]
pub struct PasswordResetTokenRepository {
    pool: MySqlPool,
}

impl PasswordResetTokenRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, token_hash: &str, expires_in_seconds: i64) -> Result<PasswordResetToken, AppError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds);

        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, used, expires_at) VALUES (?, ?, ?, false, ?)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created password reset token")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PasswordResetToken>, AppError> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, token_hash, used, expires_at, created_at FROM password_reset_tokens WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_valid_by_token_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, AppError> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, token_hash, used, expires_at, created_at FROM password_reset_tokens
             WHERE token_hash = ? AND used = false AND expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    /// CAS on `used`; `rows_affected() == 0` means the token was already
    /// consumed by a concurrent request.
    pub async fn mark_used(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE password_reset_tokens SET used = true WHERE id = ? AND used = false")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }
}
