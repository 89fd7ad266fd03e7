use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Permission, Role};

/// Create-role request. `organization_id = None` targets the system space
/// and is only honored for superadmin callers.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub is_system: bool,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            organization_id: role.organization_id,
            name: role.name,
            is_system: role.is_system,
        }
    }
}

/// Create-permission request. Custom permissions are always
/// organization-scoped; there is no endpoint to create a system permission.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub is_system: bool,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            organization_id: permission.organization_id,
            name: permission.name,
            is_system: permission.is_system,
        }
    }
}

/// Link a permission to a role.
#[derive(Debug, Deserialize)]
pub struct AssignPermissionRequest {
    pub permission_id: Uuid,
}

/// Assign a role to a user within an organization.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub permissions: Vec<String>,
}
