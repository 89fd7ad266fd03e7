use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single grantable action, e.g. `org:member:invite`. Same system/custom
/// partition as [`super::role::Role`]: `is_system ⇔ organization_id.is_none()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub is_system: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct PermissionRow {
    pub id: String,
    pub organization_id: Option<String>,
    pub name: String,
    pub is_system: bool,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            organization_id: row.organization_id.and_then(|id| Uuid::parse_str(&id).ok()),
            name: row.name,
            is_system: row.is_system,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for Permission {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let perm_row = PermissionRow::from_row(row)?;
        Ok(Permission::from(perm_row))
    }
}

/// Role-Permission association.
#[derive(Debug, Clone)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct RolePermissionRow {
    pub role_id: String,
    pub permission_id: String,
}

impl From<RolePermissionRow> for RolePermission {
    fn from(row: RolePermissionRow) -> Self {
        Self {
            role_id: Uuid::parse_str(&row.role_id).unwrap_or_default(),
            permission_id: Uuid::parse_str(&row.permission_id).unwrap_or_default(),
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for RolePermission {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let rp_row = RolePermissionRow::from_row(row)?;
        Ok(RolePermission::from(rp_row))
    }
}
