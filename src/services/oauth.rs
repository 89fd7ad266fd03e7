//! OAuth2 authorization-code grant with mandatory PKCE (S256). Client
//! credentials and implicit flows are out of scope — every client is
//! either confidential-with-PKCE or public-PKCE-only.

use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::OAuthError;
use crate::models::ClientApp;
use crate::repositories::{AuthorizationCodeRepository, ClientAppRepository, RefreshTokenRepository, UserRepository};
use crate::services::audit::AuditService;
use crate::services::rbac::RbacService;
use crate::utils::pkce::{validate_code_challenge, validate_code_verifier, verify_pkce, PKCE_METHOD_S256};
use crate::utils::secret::{generate_opaque_token, hash_opaque_token, verify_secret};
use crate::utils::token::{AccessClaims, AccessTokenInput, TokenManager};

/// GET /oauth/userinfo payload, resolved from a verified access token plus
/// a fresh lookup of the user's email (never embedded in the token itself).
pub struct UserInfo {
    pub sub: Uuid,
    pub email: String,
    pub org: Option<Uuid>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

impl OAuthTokenResponse {
    fn new(access_token: String, refresh_token: Option<String>, expires_in: i64, scope: &str) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope: scope.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OAuthService {
    pool: MySqlPool,
    client_repo: ClientAppRepository,
    code_repo: AuthorizationCodeRepository,
    refresh_token_repo: RefreshTokenRepository,
    user_repo: UserRepository,
    rbac: RbacService,
    audit: AuditService,
    token_manager: TokenManager,
    authorization_code_expiry_secs: i64,
    oauth_refresh_token_expiry_secs: i64,
}

impl OAuthService {
    pub fn new(
        pool: MySqlPool,
        token_manager: TokenManager,
        authorization_code_expiry_secs: i64,
        oauth_refresh_token_expiry_secs: i64,
    ) -> Self {
        Self {
            client_repo: ClientAppRepository::new(pool.clone()),
            code_repo: AuthorizationCodeRepository::new(pool.clone()),
            refresh_token_repo: RefreshTokenRepository::new(pool.clone()),
            user_repo: UserRepository::new(pool.clone()),
            rbac: RbacService::new(pool.clone()),
            audit: AuditService::new(pool.clone()),
            pool,
            token_manager,
            authorization_code_expiry_secs,
            oauth_refresh_token_expiry_secs,
        }
    }

    pub async fn find_client(&self, client_id: &str) -> Result<ClientApp, OAuthError> {
        self.client_repo
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| OAuthError::InvalidClient("unknown client".to_string()))
    }

    /// Validates the authorization request up to and including PKCE shape
    /// and requested scope — everything checkable before a redirect target
    /// is known to be safe.
    pub fn validate_authorization_request(
        &self,
        client: &ClientApp,
        redirect_uri: &str,
        response_type: &str,
        code_challenge: &str,
        code_challenge_method: &str,
    ) -> Result<(), OAuthError> {
        if !client.has_redirect_uri(redirect_uri) {
            return Err(OAuthError::InvalidRequest("redirect_uri not registered for this client".to_string()));
        }
        if response_type != "code" {
            return Err(OAuthError::UnsupportedGrantType(format!("unsupported response_type: {response_type}")));
        }
        if code_challenge.is_empty() || !validate_code_challenge(code_challenge) {
            return Err(OAuthError::InvalidRequest("code_challenge is required and must be well-formed".to_string()));
        }
        if code_challenge_method != PKCE_METHOD_S256 {
            return Err(OAuthError::InvalidRequest("code_challenge_method must be S256".to_string()));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_authorization_code(
        &self,
        client: &ClientApp,
        user_id: Uuid,
        organization_id: Uuid,
        redirect_uri: &str,
        scope: &str,
        code_challenge: &str,
        code_challenge_method: &str,
    ) -> Result<String, OAuthError> {
        let code = generate_opaque_token();
        let code_hash = hash_opaque_token(&code);

        self.code_repo
            .create(
                &code_hash,
                client.id,
                user_id,
                organization_id,
                redirect_uri,
                scope,
                code_challenge,
                code_challenge_method,
                self.authorization_code_expiry_secs,
            )
            .await?;

        self.audit.record(
            Some(organization_id),
            Some(user_id),
            "oauth.code_issued",
            "client_app",
            client.id.to_string(),
            serde_json::json!({ "scope": scope }),
        );

        Ok(code)
    }

    /// Verify the client, code, PKCE proof, then mark the code used and
    /// issue tokens inside one transaction — a second concurrent exchange
    /// of the same code fails atomically rather than racing the token
    /// insert against the CAS on `used`.
    pub async fn exchange_code_for_tokens(
        &self,
        code: &str,
        client_id: &str,
        client_secret: Option<&str>,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        let client = self.find_client(client_id).await?;

        if client.is_confidential {
            let secret = client_secret.ok_or_else(|| OAuthError::InvalidClient("client_secret required".to_string()))?;
            let hash = client
                .client_secret_hash
                .as_deref()
                .ok_or_else(|| OAuthError::InvalidClient("client has no secret configured".to_string()))?;
            if !verify_secret(secret, hash)? {
                return Err(OAuthError::InvalidClient("invalid client credentials".to_string()));
            }
        }

        let code_hash = hash_opaque_token(code);
        let auth_code = match self.code_repo.find_valid_by_code_hash(&code_hash).await? {
            Some(auth_code) => auth_code,
            None => {
                if let Some(reused) = self.code_repo.find_by_code_hash(&code_hash).await? {
                    if reused.used {
                        self.refresh_token_repo
                            .revoke_all_for_user_and_client(reused.user_id, reused.client_id)
                            .await
                            .map_err(|e| OAuthError::ServerError(e.to_string()))?;
                        self.audit.record(
                            Some(reused.organization_id),
                            Some(reused.user_id),
                            "oauth.code_replay_detected",
                            "client_app",
                            reused.client_id.to_string(),
                            serde_json::json!({}),
                        );
                    }
                }
                return Err(OAuthError::InvalidGrant("invalid or expired authorization code".to_string()));
            }
        };

        if auth_code.client_id != client.id {
            return Err(OAuthError::InvalidGrant("authorization code was not issued to this client".to_string()));
        }
        if auth_code.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant("redirect_uri does not match".to_string()));
        }
        if !validate_code_verifier(code_verifier) {
            return Err(OAuthError::InvalidGrant("malformed code_verifier".to_string()));
        }
        if !verify_pkce(code_verifier, &auth_code.code_challenge, &auth_code.code_challenge_method) {
            return Err(OAuthError::InvalidGrant("code_verifier does not match code_challenge".to_string()));
        }

        let user = self
            .user_repo
            .find_by_id(auth_code.user_id)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
            .ok_or_else(|| OAuthError::InvalidGrant("user no longer exists".to_string()))?;
        if !user.is_active {
            return Err(OAuthError::InvalidGrant("account is inactive".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(|e| OAuthError::ServerError(e.to_string()))?;

        self.code_repo.mark_as_used_tx(&mut tx, auth_code.id).await?;

        let refresh_token = generate_opaque_token();
        let refresh_hash = hash_opaque_token(&refresh_token);
        let family_id = Uuid::new_v4();

        self.refresh_token_repo
            .create_tx(
                &mut tx,
                &refresh_hash,
                auth_code.user_id,
                Some(auth_code.organization_id),
                Some(client.id),
                family_id,
                &auth_code.scope,
                self.oauth_refresh_token_expiry_secs,
            )
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?;

        tx.commit().await.map_err(|e| OAuthError::ServerError(e.to_string()))?;

        let permissions = self
            .rbac
            .permissions_for(&user, auth_code.organization_id)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?;
        let granted_scope = intersect_scope(&auth_code.scope, &permissions);

        self.audit.record(
            Some(auth_code.organization_id),
            Some(auth_code.user_id),
            "oauth.token_exchanged",
            "client_app",
            client.id.to_string(),
            serde_json::json!({ "scope": granted_scope }),
        );

        let access_token = self.token_manager.create_access_token(AccessTokenInput {
            user_id: auth_code.user_id,
            audience: &client.client_id,
            organization_id: Some(auth_code.organization_id),
            roles: Vec::new(),
            permissions: granted_scope.split_whitespace().map(str::to_string).collect(),
            is_superadmin: user.is_superadmin,
        })?;

        Ok(OAuthTokenResponse::new(
            access_token,
            Some(refresh_token),
            self.token_manager.access_token_expiry_secs(),
            &granted_scope,
        ))
    }

    /// `grant_type=refresh_token`. Rotates an OAuth2-issued refresh token the
    /// same way the session funnel does (CAS revoke-then-insert, reuse
    /// cascades to the whole family), but additionally enforces that the
    /// token belongs to the authenticating client and that a requested scope
    /// only narrows, never widens, what was originally granted.
    pub async fn refresh_token_grant(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: Option<&str>,
        requested_scope: Option<&str>,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        let client = self.find_client(client_id).await?;

        if client.is_confidential {
            let secret = client_secret.ok_or_else(|| OAuthError::InvalidClient("client_secret required".to_string()))?;
            let hash = client
                .client_secret_hash
                .as_deref()
                .ok_or_else(|| OAuthError::InvalidClient("client has no secret configured".to_string()))?;
            if !verify_secret(secret, hash)? {
                return Err(OAuthError::InvalidClient("invalid client credentials".to_string()));
            }
        }

        let token_hash = hash_opaque_token(refresh_token);
        let stored = self
            .refresh_token_repo
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("invalid or expired refresh token".to_string()))?;

        if stored.client_id != Some(client.id) {
            return Err(OAuthError::InvalidGrant("refresh token was not issued to this client".to_string()));
        }

        if stored.revoked {
            tracing::warn!(family_id = %stored.family_id, "oauth refresh token reuse detected, revoking family");
            self.refresh_token_repo.revoke_family(stored.family_id).await?;
            return Err(OAuthError::InvalidGrant("refresh token reuse detected".to_string()));
        }
        if stored.is_expired() {
            return Err(OAuthError::InvalidGrant("invalid or expired refresh token".to_string()));
        }

        let scope = match requested_scope {
            Some(requested) if !requested.is_empty() => {
                let narrowed: Vec<&str> = requested
                    .split_whitespace()
                    .filter(|s| stored.scope.split_whitespace().any(|g| g == *s))
                    .collect();
                if narrowed.len() != requested.split_whitespace().count() {
                    return Err(OAuthError::InvalidScope("requested scope exceeds originally granted scope".to_string()));
                }
                narrowed.join(" ")
            }
            _ => stored.scope.clone(),
        };

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("invalid or expired refresh token".to_string()))?;
        if !user.is_active {
            return Err(OAuthError::InvalidGrant("account is inactive".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(|e| OAuthError::ServerError(e.to_string()))?;

        let revoked_rows = self.refresh_token_repo.revoke_by_id_tx(&mut tx, stored.id).await?;
        if revoked_rows == 0 {
            self.refresh_token_repo.revoke_family(stored.family_id).await?;
            return Err(OAuthError::InvalidGrant("refresh token reuse detected".to_string()));
        }

        let new_refresh_token = generate_opaque_token();
        let new_refresh_hash = hash_opaque_token(&new_refresh_token);

        self.refresh_token_repo
            .create_tx(
                &mut tx,
                &new_refresh_hash,
                stored.user_id,
                stored.organization_id,
                stored.client_id,
                stored.family_id,
                &scope,
                self.oauth_refresh_token_expiry_secs,
            )
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?;

        tx.commit().await.map_err(|e| OAuthError::ServerError(e.to_string()))?;

        let permissions = match stored.organization_id {
            Some(organization_id) => self
                .rbac
                .permissions_for(&user, organization_id)
                .await
                .map_err(|e| OAuthError::ServerError(e.to_string()))?,
            None => Vec::new(),
        };
        let granted_scope = intersect_scope(&scope, &permissions);

        self.audit.record(
            stored.organization_id,
            Some(stored.user_id),
            "oauth.token_refreshed",
            "client_app",
            client.id.to_string(),
            serde_json::json!({ "scope": granted_scope }),
        );

        let access_token = self.token_manager.create_access_token(AccessTokenInput {
            user_id: stored.user_id,
            audience: &client.client_id,
            organization_id: stored.organization_id,
            roles: Vec::new(),
            permissions: granted_scope.split_whitespace().map(str::to_string).collect(),
            is_superadmin: user.is_superadmin,
        })?;

        Ok(OAuthTokenResponse::new(
            access_token,
            Some(new_refresh_token),
            self.token_manager.access_token_expiry_secs(),
            &granted_scope,
        ))
    }

    /// GET /oauth/userinfo. `claims` has already been verified by the shared
    /// bearer-token middleware; this only resolves the email address the
    /// token deliberately omits.
    pub async fn userinfo(&self, claims: &AccessClaims) -> Result<UserInfo, OAuthError> {
        let user_id = claims.user_id().map_err(|_| OAuthError::InvalidRequest("malformed subject".to_string()))?;
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
            .ok_or_else(|| OAuthError::InvalidRequest("subject no longer exists".to_string()))?;

        Ok(UserInfo {
            sub: user.id,
            email: user.email,
            org: claims.org,
            roles: claims.roles.clone(),
            permissions: claims.permissions.clone(),
        })
    }

    /// POST /oauth/logout. Accepts either a refresh token or an access
    /// token hash and revokes the matching grant's whole family. Idempotent:
    /// an unknown or already-revoked token is not an error.
    pub async fn revoke(&self, token: &str, token_type_hint: Option<&str>) -> Result<(), OAuthError> {
        let _ = token_type_hint;
        let token_hash = hash_opaque_token(token);
        if let Some(stored) = self
            .refresh_token_repo
            .find_by_token_hash(&token_hash)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
        {
            self.refresh_token_repo
                .revoke_family(stored.family_id)
                .await
                .map_err(|e| OAuthError::ServerError(e.to_string()))?;
        }
        Ok(())
    }
}

/// Scopes granted are the RBAC permissions resolved for (user, org),
/// intersected with the client's requested scope when non-empty.
fn intersect_scope(requested: &str, permissions: &[String]) -> String {
    if requested.is_empty() {
        return permissions.join(" ");
    }
    requested
        .split_whitespace()
        .filter(|s| permissions.iter().any(|p| p == s))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_scope_narrows_to_granted_permissions() {
        let permissions = vec!["org:read".to_string(), "org:write".to_string()];
        assert_eq!(intersect_scope("org:read org:delete", &permissions), "org:read");
        assert_eq!(intersect_scope("", &permissions), "org:read org:write");
    }
}
