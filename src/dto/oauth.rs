use serde::{Deserialize, Serialize};

use crate::error::OAuthError;
use crate::services::OAuthTokenResponse;

/// Authorization Request — GET /oauth/authorize. Authorization Code Flow
/// with mandatory PKCE (S256); `plain` is never accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub state: Option<String>,
    /// Forces re-authentication at the consent-with-credentials endpoint.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl AuthorizationRequest {
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_ref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}

/// Authorization Response: the redirect target's query parameters.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    pub redirect_uri: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// POST /oauth/authorize/callback — the consent-with-credentials endpoint.
/// A single-shot alternative to a stateful browser session: email/password
/// plus the original authorization parameters in one request.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsentRequest {
    pub email: String,
    pub password: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub state: Option<String>,
    pub csrf_token: String,
}

/// Token Request — POST /oauth/token (form-encoded). Only
/// `authorization_code` and `refresh_token` grants are supported.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponseDto {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

impl From<OAuthTokenResponse> for OAuthTokenResponseDto {
    fn from(response: OAuthTokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            scope: response.scope,
        }
    }
}

/// POST /oauth/logout — dual lookup by either a refresh or access token
/// hash; idempotent.
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// GET /oauth/userinfo
#[derive(Debug, Clone, Serialize)]
pub struct UserInfoResponse {
    pub sub: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Serialize)]
pub struct OAuthErrorResponse {
    pub error: &'static str,
    pub error_description: String,
}

impl From<&OAuthError> for OAuthErrorResponse {
    fn from(error: &OAuthError) -> Self {
        Self { error: error.code(), error_description: error.description() }
    }
}
