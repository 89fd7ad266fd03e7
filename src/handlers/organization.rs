use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{MemberResponse, OrganizationResponse};
use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::repositories::{MembershipRepository, OrganizationRepository, RoleRepository};

/// GET /organizations/:orgId
pub async fn get_organization_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<Json<OrganizationResponse>, AppError> {
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let org = OrganizationRepository::new(state.pool.clone())
        .find_by_id(org_id)
        .await?
        .ok_or(AppError::NotFound { resource: "organization" })?;

    Ok(Json(org.into()))
}

/// GET /organizations/:orgId/members
pub async fn list_members_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<(StatusCode, Json<Vec<MemberResponse>>), AppError> {
    ctx.require_permission(&state, "org:member:list").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let membership_repo = MembershipRepository::new(state.pool.clone());
    let role_repo = RoleRepository::new(state.pool.clone());

    let members = membership_repo.list_for_organization(org_id).await?;
    let mut responses = Vec::with_capacity(members.len());
    for (membership, email, name) in members {
        let roles = role_repo.names_for_user_in_organization(membership.user_id, org_id).await?;
        responses.push(MemberResponse::new(&membership, email, name, roles));
    }

    Ok((StatusCode::OK, Json(responses)))
}
