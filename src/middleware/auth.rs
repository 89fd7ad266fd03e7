use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::config::AppState;
use crate::error::AppError;
use crate::services::RbacService;
use crate::utils::token::AccessClaims;

/// Bearer-token authentication middleware shared by the session issuer's
/// protected endpoints, RBAC admin endpoints, and OAuth2 UserInfo — all of
/// them accept the same RS256 `AccessClaims` token, session-issued or
/// OAuth2-issued alike.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidToken)?;

    let claims = state.token_manager.verify_access_token(token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Extractor for the claims injected by [`auth_middleware`]. Use in handler
/// signatures instead of pulling the extension out manually.
#[derive(Debug, Clone)]
pub struct AuthContext(pub AccessClaims);

impl AuthContext {
    pub fn user_id(&self) -> Result<uuid::Uuid, AppError> {
        self.0.user_id()
    }

    pub fn organization_id(&self) -> Result<uuid::Uuid, AppError> {
        self.0.org.ok_or(AppError::Forbidden)
    }

    /// A superadmin bypasses the membership-derived permission list only for
    /// system permissions (per [`crate::services::rbac::RbacService::has_permission`]);
    /// an org-custom permission still requires an actual role grant, even for
    /// a superadmin.
    pub async fn require_permission(&self, state: &AppState, name: &str) -> Result<(), AppError> {
        if self.0.has_permission(name) {
            return Ok(());
        }
        if self.0.is_superadmin && RbacService::new(state.pool.clone()).is_system_permission(name).await? {
            return Ok(());
        }
        Err(AppError::Forbidden)
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(AuthContext)
            .ok_or(AppError::InvalidToken)
    }
}
