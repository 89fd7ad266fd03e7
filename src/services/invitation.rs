//! Org-scoped invitations. Acceptance creates the membership and grants the
//! pre-assigned role atomically with the compare-and-set on `accepted`.

use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Invitation;
use crate::repositories::{InvitationRepository, MembershipRepository, RoleRepository};
use crate::services::audit::AuditService;
use crate::utils::secret::{generate_opaque_token, hash_opaque_token};

#[derive(Clone)]
pub struct InvitationService {
    pool: MySqlPool,
    invitation_repo: InvitationRepository,
    membership_repo: MembershipRepository,
    role_repo: RoleRepository,
    audit: AuditService,
    invitation_expiry_secs: i64,
}

impl InvitationService {
    pub fn new(pool: MySqlPool, invitation_expiry_secs: i64) -> Self {
        Self {
            invitation_repo: InvitationRepository::new(pool.clone()),
            membership_repo: MembershipRepository::new(pool.clone()),
            role_repo: RoleRepository::new(pool.clone()),
            audit: AuditService::new(pool.clone()),
            pool,
            invitation_expiry_secs,
        }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        email: &str,
        role_id: Uuid,
        invited_by: Uuid,
    ) -> Result<(Invitation, String), AppError> {
        let role = self
            .role_repo
            .find_by_id(role_id)
            .await?
            .ok_or(AppError::NotFound { resource: "role" })?;
        if !role.is_system && role.organization_id != Some(organization_id) {
            return Err(AppError::CrossOrgAssignmentDenied);
        }

        let token = generate_opaque_token();
        let token_hash = hash_opaque_token(&token);

        let invitation = self
            .invitation_repo
            .create(organization_id, email, role_id, &token_hash, invited_by, self.invitation_expiry_secs)
            .await?;

        self.audit.record(
            Some(organization_id),
            Some(invited_by),
            "invitation.created",
            "invitation",
            invitation.id.to_string(),
            serde_json::json!({ "email": email, "role_id": role_id }),
        );

        Ok((invitation, token))
    }

    /// Consume the token, create the membership, and grant the invitation's
    /// role — all inside one transaction. `0` rows affected on the CAS means
    /// another request already accepted (or it expired underneath us).
    pub async fn accept(&self, token: &str, accepting_user_id: Uuid) -> Result<Invitation, AppError> {
        let token_hash = hash_opaque_token(token);
        let invitation = self
            .invitation_repo
            .find_valid_by_token_hash(&token_hash)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let mut tx = self.pool.begin().await.map_err(|e| AppError::Internal(e.into()))?;

        if self.invitation_repo.mark_accepted_tx(&mut tx, invitation.id).await? == 0 {
            return Err(AppError::InvalidToken);
        }

        self.membership_repo
            .create_tx(&mut tx, accepting_user_id, invitation.organization_id)
            .await?;
        self.role_repo
            .assign_to_user_tx(&mut tx, accepting_user_id, invitation.organization_id, invitation.role_id)
            .await?;

        tx.commit().await.map_err(|e| AppError::Internal(e.into()))?;

        self.audit.record(
            Some(invitation.organization_id),
            Some(accepting_user_id),
            "invitation.accepted",
            "invitation",
            invitation.id.to_string(),
            serde_json::json!({}),
        );

        Ok(invitation)
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<Invitation>, AppError> {
        self.invitation_repo.list_for_organization(organization_id).await
    }

    /// Revokes an outstanding invitation so its token can no longer be
    /// redeemed. Errors `NotFound` if it was already accepted, already
    /// revoked, or does not belong to `organization_id`.
    pub async fn revoke(&self, organization_id: Uuid, invitation_id: Uuid, revoked_by: Uuid) -> Result<(), AppError> {
        if self.invitation_repo.revoke(invitation_id, organization_id).await? == 0 {
            return Err(AppError::NotFound { resource: "invitation" });
        }

        self.audit.record(
            Some(organization_id),
            Some(revoked_by),
            "invitation.revoked",
            "invitation",
            invitation_id.to_string(),
            serde_json::json!({}),
        );

        Ok(())
    }

    /// Issues a fresh token for an outstanding invitation, invalidating the
    /// original link, and returns the new token for re-delivery.
    pub async fn resend(&self, organization_id: Uuid, invitation_id: Uuid, resent_by: Uuid) -> Result<String, AppError> {
        let token = generate_opaque_token();
        let token_hash = hash_opaque_token(&token);

        if self
            .invitation_repo
            .reissue(invitation_id, organization_id, &token_hash, self.invitation_expiry_secs)
            .await?
            == 0
        {
            return Err(AppError::NotFound { resource: "invitation" });
        }

        self.audit.record(
            Some(organization_id),
            Some(resent_by),
            "invitation.resent",
            "invitation",
            invitation_id.to_string(),
            serde_json::json!({}),
        );

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_validity_requires_unused_and_unexpired() {
        let invitation = Invitation {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "new-member@example.com".to_string(),
            role_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            invited_by: Uuid::new_v4(),
            accepted: false,
            revoked: false,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            created_at: chrono::Utc::now(),
        };
        assert!(invitation.is_valid());

        let mut accepted = invitation.clone();
        accepted.accepted = true;
        assert!(!accepted.is_valid());

        let mut revoked = invitation.clone();
        revoked.revoked = true;
        assert!(!revoked.is_valid());
    }
}
