use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{ClientAppResponse, ClientAppWithSecretResponse, CreateClientAppRequest};
use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::services::ClientAppService;

fn client_app_service(state: &AppState) -> ClientAppService {
    ClientAppService::new(state.pool.clone())
}

/// POST /organizations/:orgId/client-apps
pub async fn create_client_app_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
    Json(req): Json<CreateClientAppRequest>,
) -> Result<(StatusCode, Json<ClientAppWithSecretResponse>), AppError> {
    ctx.require_permission(&state, "client_app:manage").await?;
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let issued = client_app_service(&state)
        .create(org_id, &req.name, req.is_confidential, &req.redirect_uris)
        .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// GET /organizations/:orgId/client-apps
pub async fn list_client_apps_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path(org_id): axum::extract::Path<Uuid>,
) -> Result<Json<Vec<ClientAppResponse>>, AppError> {
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let apps = client_app_service(&state).list_for_organization(org_id).await?;
    Ok(Json(apps.into_iter().map(Into::into).collect()))
}

/// GET /organizations/:orgId/client-apps/:clientAppId
pub async fn get_client_app_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    axum::extract::Path((org_id, client_app_id)): axum::extract::Path<(Uuid, Uuid)>,
) -> Result<Json<ClientAppResponse>, AppError> {
    if ctx.organization_id()? != org_id {
        return Err(AppError::Forbidden);
    }

    let app = client_app_service(&state)
        .get(client_app_id)
        .await?
        .filter(|a| a.organization_id == org_id)
        .ok_or(AppError::NotFound { resource: "client_app" })?;

    Ok(Json(app.into()))
}
