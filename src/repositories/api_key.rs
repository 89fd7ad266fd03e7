use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ApiKey;

#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: MySqlPool,
}

impl ApiKeyRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        key_prefix: &str,
        lookup_digest: &str,
        secret_hash: &str,
        scopes: &[String],
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey, AppError> {
        let id = Uuid::new_v4();
        let scopes_json = serde_json::to_value(scopes).map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO api_keys
            (id, organization_id, name, key_prefix, lookup_digest, secret_hash, scopes, revoked, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, false, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(name)
        .bind(key_prefix)
        .bind(lookup_digest)
        .bind(secret_hash)
        .bind(&scopes_json)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created api key")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, AppError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, organization_id, name, key_prefix, lookup_digest, secret_hash,
                   scopes, revoked, expires_at, last_used_at, created_at
            FROM api_keys WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    /// Candidates sharing a `key_prefix` — narrowed further by the caller
    /// comparing `lookup_digest`, then verifying `secret_hash`.
    pub async fn find_by_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKey>, AppError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, organization_id, name, key_prefix, lookup_digest, secret_hash,
                   scopes, revoked, expires_at, last_used_at, created_at
            FROM api_keys WHERE key_prefix = ?
            "#,
        )
        .bind(key_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_by_lookup_digest(&self, key_prefix: &str, lookup_digest: &str) -> Result<Option<ApiKey>, AppError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, organization_id, name, key_prefix, lookup_digest, secret_hash,
                   scopes, revoked, expires_at, last_used_at, created_at
            FROM api_keys WHERE key_prefix = ? AND lookup_digest = ?
            "#,
        )
        .bind(key_prefix)
        .bind(lookup_digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, organization_id, name, key_prefix, lookup_digest, secret_hash,
                   scopes, revoked, expires_at, last_used_at, created_at
            FROM api_keys WHERE organization_id = ? ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn touch_last_used(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn revoke(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE api_keys SET revoked = true WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected() > 0)
    }
}
