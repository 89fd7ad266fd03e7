use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{
    AssignPermissionRequest, AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest,
    EffectivePermissionsResponse, PermissionResponse, RoleResponse,
};
use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::services::RbacService;

fn rbac_service(state: &AppState) -> RbacService {
    RbacService::new(state.pool.clone())
}

/// POST /organizations/:orgId/roles
pub async fn create_role_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), AppError> {
    ctx.require_permission(&state, "rbac:role:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let role = rbac_service(&state).create_custom_role(org_id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(role.into())))
}

/// POST /admin/rbac/roles — superadmin only; roles visible to every organization.
pub async fn create_system_role_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), AppError> {
    if !ctx.0.is_superadmin {
        return Err(AppError::Forbidden);
    }

    let role = rbac_service(&state).create_system_role(&req.name).await?;
    Ok((StatusCode::CREATED, Json(role.into())))
}

/// GET /organizations/:orgId/roles
pub async fn list_roles_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<Json<Vec<RoleResponse>>, AppError> {
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let roles = rbac_service(&state).list_roles_for_organization(org_id).await?;
    Ok(Json(roles.into_iter().map(Into::into).collect()))
}

/// POST /organizations/:orgId/permissions
pub async fn create_permission_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<PermissionResponse>), AppError> {
    ctx.require_permission(&state, "rbac:permission:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let permission = rbac_service(&state).create_custom_permission(org_id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(permission.into())))
}

/// GET /organizations/:orgId/permissions
pub async fn list_permissions_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let permissions = rbac_service(&state).list_permissions_for_organization(org_id).await?;
    Ok(Json(permissions.into_iter().map(Into::into).collect()))
}

/// POST /roles/:roleId/permissions
pub async fn assign_permission_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(role_id): axum::extract::Path<Uuid>,
    Json(req): Json<AssignPermissionRequest>,
) -> Result<StatusCode, AppError> {
    ctx.require_permission(&state, "rbac:permission:manage").await?;
    rbac_service(&state).assign_permission_to_role(role_id, req.permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /roles/:roleId/permissions/:permissionId
pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((role_id, permission_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    ctx.require_permission(&state, "rbac:permission:manage").await?;
    let removed = rbac_service(&state).revoke_permission_from_role(role_id, permission_id).await?;
    if !removed {
        return Err(AppError::NotFound { resource: "role_permission" });
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /organizations/:orgId/role-assignments
pub async fn assign_role_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<StatusCode, AppError> {
    ctx.require_permission(&state, "rbac:role:assign").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    rbac_service(&state).assign_role_to_user(req.user_id, org_id, req.role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /organizations/:orgId/users/:userId/permissions
pub async fn effective_permissions_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((org_id, user_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<Json<EffectivePermissionsResponse>, AppError> {
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let permissions = rbac_service(&state).effective_permissions_for(user_id, org_id).await?;
    Ok(Json(EffectivePermissionsResponse { permissions }))
}

/// GET /admin/rbac/roles — superadmin only; the system-space role list.
pub async fn list_system_roles_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<RoleResponse>>, AppError> {
    if !ctx.0.is_superadmin {
        return Err(AppError::Forbidden);
    }

    let roles = rbac_service(&state).list_system_roles().await?;
    Ok(Json(roles.into_iter().map(Into::into).collect()))
}

/// POST /admin/rbac/permissions — superadmin only; a permission visible to
/// every organization.
pub async fn create_system_permission_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<PermissionResponse>), AppError> {
    if !ctx.0.is_superadmin {
        return Err(AppError::Forbidden);
    }

    let permission = rbac_service(&state).create_system_permission(&req.name).await?;
    Ok((StatusCode::CREATED, Json(permission.into())))
}

/// GET /admin/rbac/permissions — the global permission list; a superadmin
/// requesting it outside any organization context sees system permissions
/// only.
pub async fn list_system_permissions_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    if !ctx.0.is_superadmin {
        return Err(AppError::Forbidden);
    }

    let permissions = rbac_service(&state).list_system_permissions().await?;
    Ok(Json(permissions.into_iter().map(Into::into).collect()))
}
