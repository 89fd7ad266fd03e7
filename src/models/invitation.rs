use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An outstanding invite to join an organization with a pre-assigned role.
/// Acceptance creates the [`super::membership::Membership`] and
/// [`super::role::UserRole`] rows atomically — see
/// `services::invitation::InvitationService::accept`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role_id: Uuid,
    pub token_hash: String,
    pub invited_by: Uuid,
    pub accepted: bool,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct InvitationRow {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub role_id: String,
    pub token_hash: String,
    pub invited_by: String,
    pub accepted: bool,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<InvitationRow> for Invitation {
    fn from(row: InvitationRow) -> Self {
        Self {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_default(),
            email: row.email,
            role_id: Uuid::parse_str(&row.role_id).unwrap_or_default(),
            token_hash: row.token_hash,
            invited_by: Uuid::parse_str(&row.invited_by).unwrap_or_default(),
            accepted: row.accepted,
            revoked: row.revoked,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for Invitation {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let invitation_row = InvitationRow::from_row(row)?;
        Ok(Invitation::from(invitation_row))
    }
}

impl Invitation {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        !self.accepted && !self.revoked && !self.is_expired()
    }
}
