use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{
    AcceptInvitationRequest, CreateInvitationRequest, InvitationResponse, InvitationWithTokenResponse,
};
use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::services::InvitationService;

fn invitation_service(state: &AppState) -> InvitationService {
    InvitationService::new(state.pool.clone(), state.config.invitation_expiry_secs)
}

/// POST /organizations/:orgId/invitations
pub async fn create_invitation_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationWithTokenResponse>), AppError> {
    ctx.require_permission(&state, "org:member:invite").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let (invitation, token) = invitation_service(&state)
        .create(org_id, &req.email, req.role_id, ctx.user_id()?)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationWithTokenResponse { invitation: invitation.into(), token }),
    ))
}

/// GET /organizations/:orgId/invitations
pub async fn list_invitations_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>, AppError> {
    ctx.require_permission(&state, "org:member:invite").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let invitations = invitation_service(&state).list_for_organization(org_id).await?;
    Ok(Json(invitations.into_iter().map(Into::into).collect()))
}

/// POST /invitations/accept — open to any authenticated user; the invited
/// email is not required to match the bearer token's subject, since an
/// invitation is consumed by whoever holds the token.
pub async fn accept_invitation_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<Json<InvitationResponse>, AppError> {
    let invitation = invitation_service(&state).accept(&req.token, ctx.user_id()?).await?;
    Ok(Json(invitation.into()))
}

/// DELETE /organizations/:orgId/invitations/:id
pub async fn revoke_invitation_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((org_id, invitation_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    ctx.require_permission(&state, "org:member:invite").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    invitation_service(&state).revoke(org_id, invitation_id, ctx.user_id()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /organizations/:orgId/invitations/:id/resend
pub async fn resend_invitation_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((org_id, invitation_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<Json<InvitationWithTokenResponse>, AppError> {
    ctx.require_permission(&state, "org:member:invite").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let token = invitation_service(&state).resend(org_id, invitation_id, ctx.user_id()?).await?;
    let invitation = invitation_service(&state)
        .list_for_organization(org_id)
        .await?
        .into_iter()
        .find(|i| i.id == invitation_id)
        .ok_or(AppError::NotFound { resource: "invitation" })?;

    Ok(Json(InvitationWithTokenResponse { invitation: invitation.into(), token }))
}
