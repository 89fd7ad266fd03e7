//! RS256 access-token codec. Refresh tokens, authorization codes, invitation
//! tokens, and password-reset tokens are never encoded here — they are
//! opaque values handled by [`crate::utils::secret`] and stored hashed.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;

/// Access tokens never outlive 1 hour, regardless of configuration.
pub const MAX_ACCESS_TOKEN_EXPIRY_SECS: i64 = 3600;

/// Claims carried by a full, organization-scoped access token (session or
/// OAuth2). `org` is `None` only for the narrow selection token, which uses
/// [`SelectionClaims`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub org: Option<Uuid>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub scope: String,
    pub is_superadmin: bool,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p == name)
    }
}

/// Claims carried by the short-lived, narrow selection token returned by
/// global login, proving only that the subject recently authenticated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

impl SelectionClaims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Parameters for minting an [`AccessClaims`] token.
pub struct AccessTokenInput<'a> {
    pub user_id: Uuid,
    pub audience: &'a str,
    pub organization_id: Option<Uuid>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_superadmin: bool,
}

/// Signs and verifies RS256 access tokens using an asymmetric key pair, so
/// resource servers can verify a token without a shared secret.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    issuer: String,
    access_token_expiry_secs: i64,
}

impl TokenManager {
    pub fn new(
        private_key_pem: &str,
        public_key_pem: &str,
        issuer: String,
        access_token_expiry_secs: i64,
    ) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid public key: {}", e)))?;

        Ok(Self {
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            issuer,
            access_token_expiry_secs: access_token_expiry_secs.min(MAX_ACCESS_TOKEN_EXPIRY_SECS),
        })
    }

    pub fn create_access_token(&self, input: AccessTokenInput<'_>) -> Result<String, AppError> {
        let now = Utc::now();
        let scope = input.permissions.join(" ");
        let claims = AccessClaims {
            sub: input.user_id.to_string(),
            iss: self.issuer.clone(),
            aud: input.audience.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_expiry_secs)).timestamp(),
            org: input.organization_id,
            roles: input.roles,
            permissions: input.permissions,
            scope,
            is_superadmin: input.is_superadmin,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }

    pub fn create_selection_token(
        &self,
        user_id: Uuid,
        expiry_secs: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SelectionClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            token_type: "selection".to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))
    }

    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_token_expiry_secs
    }

    pub fn verify_selection_token(&self, token: &str) -> Result<SelectionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        let claims = decode::<SelectionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)?;

        if claims.token_type != "selection" {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        let cfg = crate::config::Config::from_env().unwrap_or_else(|_| panic!("config"));
        TokenManager::new(&cfg.jwt_private_key, &cfg.jwt_public_key, "test-issuer".into(), 900).unwrap()
    }

    #[test]
    fn access_token_round_trips_claims() {
        let mgr = manager();
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        let token = mgr
            .create_access_token(AccessTokenInput {
                user_id,
                audience: "service",
                organization_id: Some(org_id),
                roles: vec!["owner".into()],
                permissions: vec!["org:member:invite".into()],
                is_superadmin: false,
            })
            .unwrap();

        let claims = mgr.verify_access_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.org, Some(org_id));
        assert!(claims.has_permission("org:member:invite"));
        assert!(!claims.has_permission("org:member:remove"));
        assert_eq!(claims.scope, "org:member:invite");
    }

    #[test]
    fn access_token_caps_expiry() {
        let cfg = crate::config::Config::from_env().unwrap();
        let mgr = TokenManager::new(&cfg.jwt_private_key, &cfg.jwt_public_key, "iss".into(), 99_999).unwrap();
        let token = mgr
            .create_access_token(AccessTokenInput {
                user_id: Uuid::new_v4(),
                audience: "service",
                organization_id: None,
                roles: vec![],
                permissions: vec![],
                is_superadmin: true,
            })
            .unwrap();
        let claims = mgr.verify_access_token(&token).unwrap();
        assert!(claims.exp - claims.iat <= MAX_ACCESS_TOKEN_EXPIRY_SECS);
    }

    #[test]
    fn verify_access_token_rejects_garbage() {
        let mgr = manager();
        assert!(mgr.verify_access_token("not.a.token").is_err());
    }

    #[test]
    fn selection_token_round_trips_and_rejects_wrong_kind() {
        let mgr = manager();
        let user_id = Uuid::new_v4();
        let token = mgr.create_selection_token(user_id, 300).unwrap();
        let claims = mgr.verify_selection_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);

        // An access token must not be accepted as a selection token.
        let access = mgr
            .create_access_token(AccessTokenInput {
                user_id,
                audience: "service",
                organization_id: None,
                roles: vec![],
                permissions: vec![],
                is_superadmin: false,
            })
            .unwrap();
        assert!(mgr.verify_selection_token(&access).is_err());
    }
}
