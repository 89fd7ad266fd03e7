use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named bundle of permissions. `is_system` roles have `organization_id =
/// None` and are visible to every organization; custom roles belong to
/// exactly one organization. `is_system ⇔ organization_id.is_none()` is
/// enforced by the repository on every write, not by a database constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub is_system: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: String,
    pub organization_id: Option<String>,
    pub name: String,
    pub is_system: bool,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            organization_id: row.organization_id.and_then(|id| Uuid::parse_str(&id).ok()),
            name: row.name,
            is_system: row.is_system,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for Role {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let role_row = RoleRow::from_row(row)?;
        Ok(Role::from(role_row))
    }
}

impl Role {
    pub fn is_custom(&self) -> bool {
        !self.is_system
    }
}

/// Assigns a role to a user within an organization.
#[derive(Debug, Clone)]
pub struct UserRole {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRoleRow {
    pub user_id: String,
    pub organization_id: String,
    pub role_id: String,
}

impl From<UserRoleRow> for UserRole {
    fn from(row: UserRoleRow) -> Self {
        Self {
            user_id: Uuid::parse_str(&row.user_id).unwrap_or_default(),
            organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_default(),
            role_id: Uuid::parse_str(&row.role_id).unwrap_or_default(),
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for UserRole {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let ur_row = UserRoleRow::from_row(row)?;
        Ok(UserRole::from(ur_row))
    }
}
