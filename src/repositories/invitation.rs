use chrono::{Duration, Utc};
use sqlx::{MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Invitation;

#[derive(Clone)]
pub struct InvitationRepository {
    pool: MySqlPool,
}

impl InvitationRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        email: &str,
        role_id: Uuid,
        token_hash: &str,
        invited_by: Uuid,
        expires_in_seconds: i64,
    ) -> Result<Invitation, AppError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds);

        sqlx::query(
            r#"
            INSERT INTO invitations
            (id, organization_id, email, role_id, token_hash, invited_by, accepted, revoked, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, false, false, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(email)
        .bind(role_id.to_string())
        .bind(token_hash)
        .bind(invited_by.to_string())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                    return AppError::Conflict { resource: "invitation" };
                }
            }
            AppError::Internal(e.into())
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created invitation")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, organization_id, email, role_id, token_hash, invited_by,
                   accepted, revoked, expires_at, created_at
            FROM invitations WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_valid_by_token_hash(&self, token_hash: &str) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, organization_id, email, role_id, token_hash, invited_by,
                   accepted, revoked, expires_at, created_at
            FROM invitations WHERE token_hash = ? AND accepted = false AND revoked = false AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, organization_id, email, role_id, token_hash, invited_by,
                   accepted, revoked, expires_at, created_at
            FROM invitations WHERE organization_id = ? ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    /// CAS on `accepted`, run inside the caller's transaction so acceptance
    /// commits atomically with creating the resulting membership and role
    /// assignment. `rows_affected() == 0` means another request already
    /// accepted (or the invitation expired underneath the caller).
    pub async fn mark_accepted_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET accepted = true WHERE id = ? AND accepted = false AND revoked = false AND expires_at > NOW()",
        )
        .bind(id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    /// Revokes an outstanding invitation so its token can no longer be
    /// redeemed. `rows_affected() == 0` means it was already
    /// accepted/revoked or has expired.
    pub async fn revoke(&self, id: Uuid, organization_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET revoked = true WHERE id = ? AND organization_id = ? AND accepted = false AND revoked = false",
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    /// Resets an invitation's expiry and returns a fresh token, so the
    /// original link stops working once the new one is sent.
    pub async fn reissue(
        &self,
        id: Uuid,
        organization_id: Uuid,
        token_hash: &str,
        expires_in_seconds: i64,
    ) -> Result<u64, AppError> {
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds);
        let result = sqlx::query(
            r#"
            UPDATE invitations SET token_hash = ?, expires_at = ?
            WHERE id = ? AND organization_id = ? AND accepted = false AND revoked = false
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM invitations WHERE expires_at < NOW() AND accepted = false")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }
}
