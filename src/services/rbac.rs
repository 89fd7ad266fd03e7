use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Permission, Role, User};
use crate::repositories::{
    AuditRepository, OrganizationRepository, PermissionRepository, RolePermissionRepository,
    RoleRepository, UserRepository,
};

/// Role/permission CRUD plus the cross-space assignment invariants:
///
/// - a custom permission may only be linked to a custom role of the same organization
/// - a custom permission may never be linked to a system role
/// - a role may only be assigned to a user within the role's own organization (or,
///   for system roles, any organization the user belongs to)
#[derive(Clone)]
pub struct RbacService {
    pool: MySqlPool,
    role_repo: RoleRepository,
    permission_repo: PermissionRepository,
    role_permission_repo: RolePermissionRepository,
    user_repo: UserRepository,
    organization_repo: OrganizationRepository,
    audit_repo: AuditRepository,
}

impl RbacService {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            role_repo: RoleRepository::new(pool.clone()),
            permission_repo: PermissionRepository::new(pool.clone()),
            role_permission_repo: RolePermissionRepository::new(pool.clone()),
            user_repo: UserRepository::new(pool.clone()),
            organization_repo: OrganizationRepository::new(pool.clone()),
            audit_repo: AuditRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create_custom_role(&self, organization_id: Uuid, name: &str) -> Result<Role, AppError> {
        if self.organization_repo.find_by_id(organization_id).await?.is_none() {
            return Err(AppError::NotFound { resource: "organization" });
        }
        self.role_repo.create_custom_role(organization_id, name).await
    }

    /// Superadmin-only: a role visible to every organization.
    pub async fn create_system_role(&self, name: &str) -> Result<Role, AppError> {
        self.role_repo.create_system_role(name).await
    }

    pub async fn list_system_roles(&self) -> Result<Vec<Role>, AppError> {
        self.role_repo.list_system().await
    }

    /// Superadmin-only: a permission visible to every organization.
    pub async fn create_system_permission(&self, name: &str) -> Result<Permission, AppError> {
        self.permission_repo.create_system_permission(name).await
    }

    /// The global permission list a superadmin sees outside any organization
    /// context.
    pub async fn list_system_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.permission_repo.list_system().await
    }

    pub async fn is_system_permission(&self, name: &str) -> Result<bool, AppError> {
        self.permission_repo.is_system_permission(name).await
    }

    pub async fn create_custom_permission(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Permission, AppError> {
        if self.organization_repo.find_by_id(organization_id).await?.is_none() {
            return Err(AppError::NotFound { resource: "organization" });
        }
        self.permission_repo.create_custom_permission(organization_id, name).await
    }

    /// System permissions plus the custom permissions of `organization_id`.
    pub async fn list_permissions_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Permission>, AppError> {
        self.permission_repo.list_for_organization(organization_id).await
    }

    pub async fn list_roles_for_organization(&self, organization_id: Uuid) -> Result<Vec<Role>, AppError> {
        self.role_repo.list_for_organization(organization_id).await
    }

    /// Link a permission to a role, enforcing the cross-space invariants.
    /// Locks the role row for the duration of the check so a concurrent
    /// linking attempt can't interleave between the read and the write.
    pub async fn assign_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| AppError::Internal(e.into()))?;

        let role = self
            .role_repo
            .find_by_id_for_update(&mut tx, role_id)
            .await?
            .ok_or(AppError::NotFound { resource: "role" })?;

        let permission = self
            .permission_repo
            .find_by_id(permission_id)
            .await?
            .ok_or(AppError::NotFound { resource: "permission" })?;

        if !permission.is_system {
            if role.is_system {
                tracing::warn!(%role_id, %permission_id, "refused linking custom permission to system role");
                return Err(AppError::SystemRoleCustomPermissionDenied);
            }
            if role.organization_id != permission.organization_id {
                tracing::warn!(%role_id, %permission_id, "refused cross-organization permission link");
                return Err(AppError::CrossOrgAssignmentDenied);
            }
        }

        self.role_permission_repo.assign(&mut tx, role_id, permission_id).await?;

        tx.commit().await.map_err(|e| AppError::Internal(e.into()))?;

        let audit_repo = self.audit_repo.clone();
        tokio::spawn(async move {
            let _ = audit_repo
                .record(
                    permission.organization_id.or(role.organization_id),
                    None,
                    "rbac.permission_assigned",
                    "role",
                    &role_id.to_string(),
                    serde_json::json!({ "permission_id": permission_id }),
                )
                .await;
        });

        Ok(())
    }

    pub async fn revoke_permission_from_role(&self, role_id: Uuid, permission_id: Uuid) -> Result<bool, AppError> {
        self.role_permission_repo.remove(role_id, permission_id).await
    }

    /// Assign a role to a user within `organization_id`, enforcing that a
    /// custom role can only be assigned within its own organization.
    pub async fn assign_role_to_user(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| AppError::Internal(e.into()))?;

        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound { resource: "user" });
        }

        let role = self
            .role_repo
            .find_by_id_for_update(&mut tx, role_id)
            .await?
            .ok_or(AppError::NotFound { resource: "role" })?;

        if !role.is_system && role.organization_id != Some(organization_id) {
            tracing::warn!(%user_id, %organization_id, %role_id, "refused cross-organization role assignment");
            return Err(AppError::CrossOrgAssignmentDenied);
        }

        self.role_repo
            .assign_to_user_tx(&mut tx, user_id, organization_id, role_id)
            .await?;

        tx.commit().await.map_err(|e| AppError::Internal(e.into()))?;

        let audit_repo = self.audit_repo.clone();
        tokio::spawn(async move {
            let _ = audit_repo
                .record(
                    Some(organization_id),
                    Some(user_id),
                    "rbac.role_assigned",
                    "user",
                    &user_id.to_string(),
                    serde_json::json!({ "role_id": role_id }),
                )
                .await;
        });

        Ok(())
    }

    /// Same resolution as [`Self::permissions_for`], looked up by id — the
    /// value the effective-permissions listing endpoint returns.
    pub async fn effective_permissions_for(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Vec<String>, AppError> {
        let user = self.user_repo.find_by_id(user_id).await?.ok_or(AppError::NotFound { resource: "user" })?;
        self.permissions_for(&user, organization_id).await
    }

    /// Flattened permission names granted to `user_id` within `organization_id`
    /// — the value used both for API authorization checks and the
    /// `permissions` claim of an issued access token.
    pub async fn effective_permissions(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Vec<String>, AppError> {
        let role_ids = self.role_repo.ids_for_user_in_organization(user_id, organization_id).await?;
        self.permission_repo.names_for_roles(&role_ids).await
    }

    /// Permission names granted to `user` within `organization_id` — a
    /// superadmin always resolves to the system-permission set, regardless
    /// of any role assignment in that organization; everyone else resolves
    /// to [`Self::effective_permissions`]. This is the value both an issued
    /// access token's `permissions` claim and [`Self::has_permission`] are
    /// built from, so the two stay consistent.
    pub async fn permissions_for(&self, user: &User, organization_id: Uuid) -> Result<Vec<String>, AppError> {
        if user.is_superadmin {
            let system = self.permission_repo.list_system().await?;
            return Ok(system.into_iter().map(|p| p.name).collect());
        }
        self.effective_permissions(user.id, organization_id).await
    }

    /// `true` iff (a) the user is a superadmin and `permission_name` names a
    /// system permission, or (b) the user holds it through a role assignment
    /// in `organization_id`.
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        permission_name: &str,
    ) -> Result<bool, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound { resource: "user" })?;

        if user.is_superadmin {
            return self.permission_repo.is_system_permission(permission_name).await;
        }

        let permissions = self.effective_permissions(user_id, organization_id).await?;
        Ok(permissions.iter().any(|p| p == permission_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_org_check_matches_invariant_shape() {
        let role_org = Some(Uuid::new_v4());
        let other_org = Uuid::new_v4();
        assert_ne!(role_org, Some(other_org));
    }
}
