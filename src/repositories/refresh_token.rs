use chrono::{Duration, Utc};
use sqlx::{MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::RefreshToken;

#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: MySqlPool,
}

impl RefreshTokenRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        token_hash: &str,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        client_id: Option<Uuid>,
        family_id: Uuid,
        scope: &str,
        expires_in_seconds: i64,
    ) -> Result<RefreshToken, AppError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
            (id, token_hash, user_id, organization_id, client_id, family_id, scope, revoked, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, false, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(organization_id.map(|o| o.to_string()))
        .bind(client_id.map(|c| c.to_string()))
        .bind(family_id.to_string())
        .bind(scope)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created refresh token")))
    }

    /// Same as [`Self::create`] but runs inside the caller's transaction, so
    /// rotation (revoke-old + insert-new) commits as one atomic unit.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        token_hash: &str,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        client_id: Option<Uuid>,
        family_id: Uuid,
        scope: &str,
        expires_in_seconds: i64,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
            (id, token_hash, user_id, organization_id, client_id, family_id, scope, revoked, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, false, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(organization_id.map(|o| o.to_string()))
        .bind(client_id.map(|c| c.to_string()))
        .bind(family_id.to_string())
        .bind(scope)
        .bind(expires_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        Ok(id)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshToken>, AppError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token_hash, user_id, organization_id, client_id, family_id, scope,
                   revoked, expires_at, created_at
            FROM refresh_tokens WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token_hash, user_id, organization_id, client_id, family_id, scope,
                   revoked, expires_at, created_at
            FROM refresh_tokens WHERE token_hash = ?
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    /// Compare-and-set revoke: the caller rotating a token must see
    /// `rows_affected() == 1` before trusting the rotation; `0` means
    /// another request already consumed (or revoked) this token, and
    /// signals replay — the whole family should be revoked.
    pub async fn revoke_by_id_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE id = ? AND revoked = false")
            .bind(id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    pub async fn revoke_family(&self, family_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE family_id = ? AND revoked = false")
            .bind(family_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    /// Revokes every non-revoked token a (user, client) pair has ever been
    /// issued — used when a replayed authorization code is detected, since
    /// the exchange that should have been the sole consumer of that code's
    /// lineage is no longer trustworthy.
    pub async fn revoke_all_for_user_and_client(&self, user_id: Uuid, client_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true WHERE user_id = ? AND client_id = ? AND revoked = false",
        )
        .bind(user_id.to_string())
        .bind(client_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = ? AND revoked = false")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }
}
