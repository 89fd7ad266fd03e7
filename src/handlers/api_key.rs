use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{ApiKeyResponse, ApiKeyWithSecretResponse, CreateApiKeyRequest};
use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::services::ApiKeyService;

fn api_key_service(state: &AppState) -> ApiKeyService {
    ApiKeyService::new(state.pool.clone(), state.config.api_key_pepper.clone())
}

/// POST /organizations/:orgId/dev/api-keys
pub async fn create_api_key_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyWithSecretResponse>), AppError> {
    ctx.require_permission(&state, "api_key:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let issued = api_key_service(&state)
        .create(org_id, &req.name, &req.scopes, req.expires_in_seconds)
        .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// GET /organizations/:orgId/dev/api-keys
pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    ctx.require_permission(&state, "api_key:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let keys = api_key_service(&state).list_for_organization(org_id).await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

/// GET /organizations/:orgId/dev/api-keys/:keyId
pub async fn get_api_key_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((org_id, key_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    ctx.require_permission(&state, "api_key:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let key = api_key_service(&state)
        .get(key_id)
        .await?
        .filter(|k| k.organization_id == org_id)
        .ok_or(AppError::NotFound { resource: "api_key" })?;

    Ok(Json(key.into()))
}

/// DELETE /organizations/:orgId/dev/api-keys/:keyId — revokes, never
/// hard-deletes; a revoked key's audit trail stays intact.
pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((org_id, key_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    ctx.require_permission(&state, "api_key:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let key = api_key_service(&state)
        .get(key_id)
        .await?
        .filter(|k| k.organization_id == org_id)
        .ok_or(AppError::NotFound { resource: "api_key" })?;

    if !api_key_service(&state).revoke(key.id).await? {
        return Err(AppError::NotFound { resource: "api_key" });
    }
    Ok(StatusCode::NO_CONTENT)
}
