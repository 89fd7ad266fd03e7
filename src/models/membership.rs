use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a membership row. `Invited` marks a membership created by
/// an accepted invitation's grant before the user's first login into that
/// organization in some flows; `Removed` is a soft-delete so audit history
/// and past role grants stay intact instead of deleting the row outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Invited,
    Removed,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invited => "invited",
            Self::Removed => "removed",
        }
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "invited" => Ok(Self::Invited),
            "removed" => Ok(Self::Removed),
            _ => Err(()),
        }
    }
}

/// Ties a user to an organization. Existence of an `active` membership row
/// is what makes an organization selectable at login; role assignment is
/// separate (see [`super::role::UserRole`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Self {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&row.user_id).unwrap_or_default(),
            organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_default(),
            status: row.status.parse().unwrap_or(MembershipStatus::Active),
            created_at: row.created_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for Membership {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let membership_row = MembershipRow::from_row(row)?;
        Ok(Membership::from(membership_row))
    }
}

/// Organization summary returned from the global-login organization list —
/// just enough for the client to render a picker before selecting in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub roles: Vec<String>,
}
