use chrono::{Duration, Utc};
use sqlx::{MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::error::OAuthError;
use crate::models::AuthorizationCode;

/// Authorization codes never outlive 10 minutes, regardless of what a
/// caller asks for.
const MAX_EXPIRATION_SECS: i64 = 600;

#[derive(Clone)]
pub struct AuthorizationCodeRepository {
    pool: MySqlPool,
}

#[allow(clippy::too_many_arguments)]
impl AuthorizationCodeRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        code_hash: &str,
        client_id: Uuid,
        user_id: Uuid,
        organization_id: Uuid,
        redirect_uri: &str,
        scope: &str,
        code_challenge: &str,
        code_challenge_method: &str,
        expires_in_seconds: i64,
    ) -> Result<AuthorizationCode, OAuthError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds.min(MAX_EXPIRATION_SECS));

        sqlx::query(
            r#"
            INSERT INTO oauth_authorization_codes
            (id, code_hash, client_id, user_id, organization_id, redirect_uri, scope,
             code_challenge, code_challenge_method, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(code_hash)
        .bind(client_id.to_string())
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .bind(redirect_uri)
        .bind(scope)
        .bind(code_challenge)
        .bind(code_challenge_method)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| OAuthError::ServerError(format!("database error: {e}")))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| OAuthError::ServerError("failed to fetch created authorization code".to_string()))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorizationCode>, OAuthError> {
        sqlx::query_as::<_, AuthorizationCode>(
            r#"
            SELECT id, code_hash, client_id, user_id, organization_id, redirect_uri, scope,
                   code_challenge, code_challenge_method, expires_at, used, created_at
            FROM oauth_authorization_codes
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OAuthError::ServerError(format!("database error: {e}")))
    }

    /// Unfiltered lookup used only to distinguish "unknown code" from "this
    /// code was already used" when deciding whether a failed exchange is a
    /// replay worth raising a family-revocation alarm over.
    pub async fn find_by_code_hash(&self, code_hash: &str) -> Result<Option<AuthorizationCode>, OAuthError> {
        sqlx::query_as::<_, AuthorizationCode>(
            r#"
            SELECT id, code_hash, client_id, user_id, organization_id, redirect_uri, scope,
                   code_challenge, code_challenge_method, expires_at, used, created_at
            FROM oauth_authorization_codes
            WHERE code_hash = ?
            "#,
        )
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OAuthError::ServerError(format!("database error: {e}")))
    }

    pub async fn find_valid_by_code_hash(
        &self,
        code_hash: &str,
    ) -> Result<Option<AuthorizationCode>, OAuthError> {
        sqlx::query_as::<_, AuthorizationCode>(
            r#"
            SELECT id, code_hash, client_id, user_id, organization_id, redirect_uri, scope,
                   code_challenge, code_challenge_method, expires_at, used, created_at
            FROM oauth_authorization_codes
            WHERE code_hash = ? AND used = false AND expires_at > NOW()
            "#,
        )
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OAuthError::ServerError(format!("database error: {e}")))
    }

    /// Compare-and-set mark-used, run inside a caller-supplied transaction so
    /// it commits atomically with the refresh/access token issuance that
    /// follows it. A second concurrent exchange of the same code sees
    /// `rows_affected() == 0` and fails the whole transaction.
    pub async fn mark_as_used_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: Uuid,
    ) -> Result<(), OAuthError> {
        let result = sqlx::query(
            r#"
            UPDATE oauth_authorization_codes
            SET used = true
            WHERE id = ? AND used = false
            "#,
        )
        .bind(id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| OAuthError::ServerError(format!("database error: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(OAuthError::InvalidGrant(
                "authorization code already used or not found".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn delete_expired(&self) -> Result<u64, OAuthError> {
        let result = sqlx::query("DELETE FROM oauth_authorization_codes WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| OAuthError::ServerError(format!("database error: {e}")))?;
        Ok(result.rows_affected())
    }
}
