use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ApiKey;
use crate::services::IssuedApiKey;

/// Create-API-key request. Organization owners and superadmins only.
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub revoked: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            organization_id: key.organization_id,
            name: key.name,
            key_prefix: key.key_prefix,
            scopes: key.scopes.0,
            revoked: key.revoked,
            expires_at: key.expires_at,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

/// Create-API-key response. `key` is the full `prefix.secret` value,
/// returned only this once.
#[derive(Debug, Serialize)]
pub struct ApiKeyWithSecretResponse {
    #[serde(flatten)]
    pub key: ApiKeyResponse,
    pub secret: String,
}

impl From<IssuedApiKey> for ApiKeyWithSecretResponse {
    fn from(issued: IssuedApiKey) -> Self {
        Self {
            key: issued.record.into(),
            secret: issued.plaintext,
        }
    }
}
