use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{OrganizationSummary, User};
use crate::repositories::{
    MembershipRepository, OrganizationRepository, PasswordResetTokenRepository, RefreshTokenRepository,
    RoleRepository, UserRepository,
};
use crate::services::rbac::RbacService;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::secret::{generate_opaque_token, hash_opaque_token};
use crate::utils::token::{AccessTokenInput, TokenManager, TokenPair};
use crate::utils::validation::{
    slugify, validate_and_normalize_email, validate_name, validate_password_strength, validate_slug,
};

/// Global login (credentials → selection token + org list), organization
/// selection (selection token + org id → scoped token pair), refresh-token
/// rotation with replay detection, and password reset.
#[derive(Clone)]
pub struct AuthService {
    pool: MySqlPool,
    user_repo: UserRepository,
    membership_repo: MembershipRepository,
    organization_repo: OrganizationRepository,
    role_repo: RoleRepository,
    refresh_token_repo: RefreshTokenRepository,
    password_reset_repo: PasswordResetTokenRepository,
    rbac: RbacService,
    token_manager: TokenManager,
    selection_token_expiry_secs: i64,
    session_refresh_token_expiry_secs: i64,
    oauth_refresh_token_expiry_secs: i64,
    password_reset_expiry_secs: i64,
}

pub struct SelectableOrganizations {
    pub selection_token: String,
    pub organizations: Vec<OrganizationSummary>,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: MySqlPool,
        token_manager: TokenManager,
        selection_token_expiry_secs: i64,
        session_refresh_token_expiry_secs: i64,
        oauth_refresh_token_expiry_secs: i64,
        password_reset_expiry_secs: i64,
    ) -> Self {
        Self {
            user_repo: UserRepository::new(pool.clone()),
            membership_repo: MembershipRepository::new(pool.clone()),
            organization_repo: OrganizationRepository::new(pool.clone()),
            role_repo: RoleRepository::new(pool.clone()),
            refresh_token_repo: RefreshTokenRepository::new(pool.clone()),
            password_reset_repo: PasswordResetTokenRepository::new(pool.clone()),
            rbac: RbacService::new(pool.clone()),
            pool,
            token_manager,
            selection_token_expiry_secs,
            session_refresh_token_expiry_secs,
            oauth_refresh_token_expiry_secs,
            password_reset_expiry_secs,
        }
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AppError> {
        let email = validate_and_normalize_email(email)?;
        validate_password_strength(password)?;
        validate_name(name)?;
        let password_hash = hash_password(password)?;
        self.user_repo.create(&email, &password_hash, name).await
    }

    /// Verify credentials and return a short-lived selection token plus the
    /// organizations the user may select into.
    pub async fn login(&self, email: &str, password: &str) -> Result<SelectableOrganizations, AppError> {
        let email = validate_and_normalize_email(email)?;
        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let selection_token = self
            .token_manager
            .create_selection_token(user.id, self.selection_token_expiry_secs)?;
        let organizations = self.membership_repo.list_for_user(user.id).await?;

        Ok(SelectableOrganizations { selection_token, organizations })
    }

    /// Consume a selection token and mint an organization-scoped token pair.
    pub async fn select_organization(
        &self,
        selection_token: &str,
        organization_id: Uuid,
    ) -> Result<TokenPair, AppError> {
        let claims = self.token_manager.verify_selection_token(selection_token)?;
        let user_id = claims.user_id()?;

        let user = self.user_repo.find_by_id(user_id).await?.ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        if !self.membership_repo.exists(user_id, organization_id).await? {
            return Err(AppError::Forbidden);
        }

        self.issue_token_pair(&user, Some(organization_id), None, self.session_refresh_token_expiry_secs)
            .await
    }

    /// Create an organization, grant its creator an owner role, and mint a
    /// token pair scoped to it — an alternative to [`Self::select_organization`]
    /// for a user with no existing memberships to choose from.
    pub async fn create_organization(
        &self,
        selection_token: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<TokenPair, AppError> {
        let claims = self.token_manager.verify_selection_token(selection_token)?;
        let user_id = claims.user_id()?;

        let user = self.user_repo.find_by_id(user_id).await?.ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let slug = match slug {
            Some(s) => {
                validate_slug(s)?;
                s.to_string()
            }
            None => slugify(name),
        };

        let organization = self.organization_repo.create(name, &slug).await?;
        let owner_role = self.role_repo.create_custom_role(organization.id, "owner").await?;
        self.membership_repo.create(user.id, organization.id).await?;

        let mut tx = self.pool.begin().await.map_err(|e| AppError::Internal(e.into()))?;
        self.role_repo
            .assign_to_user_tx(&mut tx, user.id, organization.id, owner_role.id)
            .await?;
        tx.commit().await.map_err(|e| AppError::Internal(e.into()))?;

        self.issue_token_pair(&user, Some(organization.id), None, self.session_refresh_token_expiry_secs)
            .await
    }

    /// Rotate a session or OAuth2 refresh token. The old token is revoked in
    /// the same transaction that inserts the new one; if the old token was
    /// already revoked (a replayed, previously-rotated token), the whole
    /// family is revoked and the rotation is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let token_hash = hash_opaque_token(refresh_token);
        let stored = self
            .refresh_token_repo
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if stored.revoked {
            tracing::warn!(family_id = %stored.family_id, "refresh token reuse detected, revoking family");
            self.refresh_token_repo.revoke_family(stored.family_id).await?;
            return Err(AppError::InvalidToken);
        }
        if stored.is_expired() {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let mut tx = self.pool.begin().await.map_err(|e| AppError::Internal(e.into()))?;

        let revoked_rows = self.refresh_token_repo.revoke_by_id_tx(&mut tx, stored.id).await?;
        if revoked_rows == 0 {
            // Lost the race with a concurrent rotation of the same token.
            self.refresh_token_repo.revoke_family(stored.family_id).await?;
            return Err(AppError::InvalidToken);
        }

        let new_refresh_token = generate_opaque_token();
        let new_refresh_hash = hash_opaque_token(&new_refresh_token);
        let ttl = if stored.client_id.is_some() {
            self.oauth_refresh_token_expiry_secs
        } else {
            self.session_refresh_token_expiry_secs
        };

        self.refresh_token_repo
            .create_tx(
                &mut tx,
                &new_refresh_hash,
                stored.user_id,
                stored.organization_id,
                stored.client_id,
                stored.family_id,
                &stored.scope,
                ttl,
            )
            .await?;

        tx.commit().await.map_err(|e| AppError::Internal(e.into()))?;

        let (roles, permissions, is_superadmin) = self.claims_for(&user, stored.organization_id).await?;
        let access_token = self.token_manager.create_access_token(AccessTokenInput {
            user_id: user.id,
            audience: "service",
            organization_id: stored.organization_id,
            roles,
            permissions,
            is_superadmin,
        })?;

        Ok(TokenPair::new(access_token, new_refresh_token, self.access_token_ttl()))
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let token_hash = hash_opaque_token(refresh_token);
        if let Some(stored) = self.refresh_token_repo.find_by_token_hash(&token_hash).await? {
            self.refresh_token_repo.revoke_family(stored.family_id).await?;
        }
        Ok(())
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.refresh_token_repo.revoke_all_for_user(user_id).await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo.find_by_id(user_id).await?.ok_or(AppError::NotFound { resource: "user" })
    }

    /// Display name is the only mutable profile field; email is the login
    /// identity and is never changed post-registration.
    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> Result<User, AppError> {
        validate_name(name)?;
        self.user_repo.update_name(user_id, name).await?;
        self.user_repo.find_by_id(user_id).await?.ok_or(AppError::NotFound { resource: "user" })
    }

    /// Requires the current password and invalidates every outstanding
    /// refresh token belonging to the user.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self.user_repo.find_by_id(user_id).await?.ok_or(AppError::NotFound { resource: "user" })?;
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }
        validate_password_strength(new_password)?;

        let new_hash = hash_password(new_password)?;
        self.user_repo.update_password(user_id, &new_hash).await?;
        self.refresh_token_repo.revoke_all_for_user(user_id).await?;
        Ok(())
    }

    /// Returns `Ok(())` unconditionally — existence of the email is never
    /// revealed to the caller. The generated token is returned only so the
    /// caller (the delivery service) can dispatch it; it is never logged.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, AppError> {
        let email = validate_and_normalize_email(email)?;
        let user = match self.user_repo.find_by_email(&email).await? {
            Some(u) => u,
            None => return Ok(None),
        };

        let reset_token = generate_opaque_token();
        let token_hash = hash_opaque_token(&reset_token);
        self.password_reset_repo
            .create(user.id, &token_hash, self.password_reset_expiry_secs)
            .await?;

        Ok(Some(reset_token))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        validate_password_strength(new_password)?;

        let token_hash = hash_opaque_token(token);
        let reset = self
            .password_reset_repo
            .find_valid_by_token_hash(&token_hash)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if self.password_reset_repo.mark_used(reset.id).await? == 0 {
            // Lost the race with a concurrent reset using the same token.
            return Err(AppError::InvalidToken);
        }

        let new_hash = hash_password(new_password)?;
        self.user_repo.update_password(reset.user_id, &new_hash).await?;
        self.refresh_token_repo.revoke_all_for_user(reset.user_id).await?;

        Ok(())
    }

    /// Mint and persist a fresh token pair, starting a new rotation family.
    pub async fn issue_token_pair(
        &self,
        user: &User,
        organization_id: Option<Uuid>,
        client_id: Option<Uuid>,
        refresh_ttl_secs: i64,
    ) -> Result<TokenPair, AppError> {
        let (roles, permissions, is_superadmin) = self.claims_for(user, organization_id).await?;

        let access_token = self.token_manager.create_access_token(AccessTokenInput {
            user_id: user.id,
            audience: "service",
            organization_id,
            roles,
            permissions,
            is_superadmin,
        })?;

        let refresh_token = generate_opaque_token();
        let refresh_hash = hash_opaque_token(&refresh_token);
        let family_id = Uuid::new_v4();
        let scope = String::new();

        self.refresh_token_repo
            .create(&refresh_hash, user.id, organization_id, client_id, family_id, &scope, refresh_ttl_secs)
            .await?;

        Ok(TokenPair::new(access_token, refresh_token, self.access_token_ttl()))
    }

    async fn claims_for(
        &self,
        user: &User,
        organization_id: Option<Uuid>,
    ) -> Result<(Vec<String>, Vec<String>, bool), AppError> {
        let Some(organization_id) = organization_id else {
            return Ok((Vec::new(), Vec::new(), user.is_superadmin));
        };

        let roles = self.role_repo.names_for_user_in_organization(user.id, organization_id).await?;
        let permissions = self.rbac.permissions_for(user, organization_id).await?;
        Ok((roles, permissions, user.is_superadmin))
    }

    fn access_token_ttl(&self) -> i64 {
        self.token_manager.access_token_expiry_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_carries_bearer_type() {
        let pair = TokenPair::new("access".into(), "refresh".into(), 900);
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn organization_slug_falls_back_to_slugified_name_when_absent() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert!(validate_slug(&slugify("Acme Corp")).is_ok());
    }
}
