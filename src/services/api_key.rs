//! Long-lived machine credentials: `prefix.secret`, looked up by prefix +
//! HMAC digest and verified against a bcrypt hash.

use chrono::{DateTime, Duration, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ApiKey;
use crate::repositories::ApiKeyRepository;
use crate::utils::secret::{generate_secret, generate_secret_with_length, hash_secret, hmac_lookup_digest, verify_secret};

const KEY_PREFIX_LENGTH: usize = 12;

#[derive(Clone)]
pub struct ApiKeyService {
    repo: ApiKeyRepository,
    pepper: String,
}

/// The plaintext key is returned exactly once, at creation time; the
/// server never stores or reconstructs it afterward.
pub struct IssuedApiKey {
    pub record: ApiKey,
    pub plaintext: String,
}

impl ApiKeyService {
    pub fn new(pool: MySqlPool, pepper: String) -> Self {
        Self {
            repo: ApiKeyRepository::new(pool),
            pepper,
        }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        scopes: &[String],
        expires_in_seconds: Option<i64>,
    ) -> Result<IssuedApiKey, AppError> {
        let key_prefix = generate_secret_with_length(KEY_PREFIX_LENGTH);
        let secret = generate_secret();
        let lookup_digest = hmac_lookup_digest(self.pepper.as_bytes(), &secret);
        let secret_hash = hash_secret(&secret)?;
        let expires_at: Option<DateTime<Utc>> = expires_in_seconds.map(|s| Utc::now() + Duration::seconds(s));

        let record = self
            .repo
            .create(organization_id, name, &key_prefix, &lookup_digest, &secret_hash, scopes, expires_at)
            .await?;

        Ok(IssuedApiKey {
            record,
            plaintext: format!("{key_prefix}.{secret}"),
        })
    }

    /// Parse `prefix.secret`, find the matching row by prefix + HMAC digest,
    /// then verify the bcrypt hash — the HMAC only narrows candidates, the
    /// bcrypt comparison is the actual security boundary.
    pub async fn verify(&self, presented_key: &str) -> Result<ApiKey, AppError> {
        let (key_prefix, secret) = presented_key.split_once('.').ok_or(AppError::InvalidToken)?;

        let lookup_digest = hmac_lookup_digest(self.pepper.as_bytes(), secret);
        let key = self
            .repo
            .find_by_lookup_digest(key_prefix, &lookup_digest)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !verify_secret(secret, &key.secret_hash)? || !key.is_valid() {
            return Err(AppError::InvalidToken);
        }

        self.repo.touch_last_used(key.id).await?;
        Ok(key)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ApiKey>, AppError> {
        self.repo.find_by_id(id).await
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        self.repo.list_for_organization(organization_id).await
    }

    pub async fn revoke(&self, id: Uuid) -> Result<bool, AppError> {
        self.repo.revoke(id).await
    }

    pub fn check_scope(api_key: &ApiKey, required_scope: &str) -> bool {
        api_key.has_scope(required_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presented_key_without_separator_is_rejected() {
        assert!("no-separator-here".split_once('.').is_none());
    }

    #[test]
    fn presented_key_splits_on_first_dot_only() {
        let (prefix, secret) = "abc123.se.cret".split_once('.').unwrap();
        assert_eq!(prefix, "abc123");
        assert_eq!(secret, "se.cret");
    }
}
