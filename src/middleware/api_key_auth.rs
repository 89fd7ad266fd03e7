use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::config::AppState;
use crate::error::AppError;
use crate::models::ApiKey;
use crate::services::ApiKeyService;

/// Header carrying the `prefix.secret` API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Authenticates `X-API-Key` requests, populating the request context as if
/// the key's owner had logged in to its organization.
pub async fn api_key_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let presented_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AppError::InvalidToken)?
        .to_string();

    let service = ApiKeyService::new(state.pool.clone(), state.config.api_key_pepper.clone());
    let api_key = service.verify(&presented_key).await?;

    request.extensions_mut().insert(api_key);

    Ok(next.run(request).await)
}

/// Extractor for the `ApiKey` row injected by [`api_key_auth_middleware`].
#[derive(Debug, Clone)]
pub struct ApiKeyContext(pub ApiKey);

impl ApiKeyContext {
    pub fn require_scope(&self, scope: &str) -> Result<(), AppError> {
        if self.0.has_scope(scope) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for ApiKeyContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ApiKey>()
            .cloned()
            .map(ApiKeyContext)
            .ok_or(AppError::InvalidToken)
    }
}
