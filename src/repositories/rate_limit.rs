use chrono::{DateTime, Duration, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;

/// Fixed-window counters keyed by an arbitrary identifier (IP, user id, API
/// key id) and endpoint name. The service layer decides whether to fail
/// open or closed when this repository is unreachable.
#[derive(Clone)]
pub struct RateLimitRepository {
    pool: MySqlPool,
}

impl RateLimitRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Increment the request count for an identifier/endpoint within the
    /// current window, returning the count after increment.
    pub async fn increment(
        &self,
        identifier: &str,
        endpoint: &str,
        window_seconds: i64,
    ) -> Result<i32, AppError> {
        let id = Uuid::new_v4();
        let window_start = Utc::now() - Duration::seconds(window_seconds);

        let result = sqlx::query(
            r#"
            UPDATE rate_limit_entries
            SET request_count = request_count + 1
            WHERE identifier = ? AND endpoint = ? AND window_start > ?
            "#,
        )
        .bind(identifier)
        .bind(endpoint)
        .bind(window_start)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        if result.rows_affected() > 0 {
            let count = sqlx::query_scalar::<_, i32>(
                r#"
                SELECT request_count
                FROM rate_limit_entries
                WHERE identifier = ? AND endpoint = ? AND window_start > ?
                "#,
            )
            .bind(identifier)
            .bind(endpoint)
            .bind(window_start)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

            return Ok(count);
        }

        sqlx::query("DELETE FROM rate_limit_entries WHERE identifier = ? AND endpoint = ?")
            .bind(identifier)
            .bind(endpoint)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO rate_limit_entries (id, identifier, endpoint, request_count, window_start)
            VALUES (?, ?, ?, 1, NOW())
            "#,
        )
        .bind(id.to_string())
        .bind(identifier)
        .bind(endpoint)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        Ok(1)
    }

    pub async fn get_count(
        &self,
        identifier: &str,
        endpoint: &str,
        window_seconds: i64,
    ) -> Result<i32, AppError> {
        let window_start = Utc::now() - Duration::seconds(window_seconds);

        let count = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT COALESCE(request_count, 0)
            FROM rate_limit_entries
            WHERE identifier = ? AND endpoint = ? AND window_start > ?
            "#,
        )
        .bind(identifier)
        .bind(endpoint)
        .bind(window_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        Ok(count.unwrap_or(0))
    }

    pub async fn reset(&self, identifier: &str, endpoint: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM rate_limit_entries WHERE identifier = ? AND endpoint = ?")
            .bind(identifier)
            .bind(endpoint)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(())
    }

    pub async fn get_window_start(
        &self,
        identifier: &str,
        endpoint: &str,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT window_start FROM rate_limit_entries WHERE identifier = ? AND endpoint = ?",
        )
        .bind(identifier)
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn delete_expired(&self, window_seconds: i64) -> Result<u64, AppError> {
        let window_start = Utc::now() - Duration::seconds(window_seconds);

        let result = sqlx::query("DELETE FROM rate_limit_entries WHERE window_start < ?")
            .bind(window_start)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(result.rows_affected())
    }
}
