use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A rotating, opaque, store-backed refresh token. Backs both the session
/// funnel (`client_id = None`) and the OAuth2 authorization-code flow
/// (`client_id = Some`). `family_id` is constant across a rotation chain;
/// reuse of an already-rotated token revokes the whole family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub token_hash: String,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub family_id: Uuid,
    pub scope: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRow {
    pub id: String,
    pub token_hash: String,
    pub user_id: String,
    pub organization_id: Option<String>,
    pub client_id: Option<String>,
    pub family_id: String,
    pub scope: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            token_hash: row.token_hash,
            user_id: Uuid::parse_str(&row.user_id).unwrap_or_default(),
            organization_id: row.organization_id.and_then(|id| Uuid::parse_str(&id).ok()),
            client_id: row.client_id.and_then(|id| Uuid::parse_str(&id).ok()),
            family_id: Uuid::parse_str(&row.family_id).unwrap_or_default(),
            scope: row.scope,
            revoked: row.revoked,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for RefreshToken {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let token_row = RefreshTokenRow::from_row(row)?;
        Ok(RefreshToken::from(token_row))
    }
}

impl RefreshToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }
}
