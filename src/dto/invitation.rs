use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Invitation;

/// POST /organizations/:orgId/invitations
#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role_id: Uuid,
    pub accepted: bool,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            organization_id: invitation.organization_id,
            email: invitation.email,
            role_id: invitation.role_id,
            accepted: invitation.accepted,
            revoked: invitation.revoked,
            expires_at: invitation.expires_at,
            created_at: invitation.created_at,
        }
    }
}

/// Created-invitation response: the token is returned once, for the
/// (external) email-delivery collaborator to send.
#[derive(Debug, Serialize)]
pub struct InvitationWithTokenResponse {
    #[serde(flatten)]
    pub invitation: InvitationResponse,
    pub token: String,
}

/// POST /invitations/:token/accept
#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}
