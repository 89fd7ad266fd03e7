use axum::{extract::State, http::StatusCode, Json};

use crate::config::AppState;
use crate::dto::{
    ChangePasswordRequest, CreateOrganizationRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
    LogoutRequest, MessageResponse, RefreshRequest, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    SelectOrganizationRequest, TokenResponse, UpdateProfileRequest, UserProfileResponse,
};
use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::services::AuthService;

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.pool.clone(),
        state.token_manager.clone(),
        state.config.selection_token_expiry_secs,
        state.config.session_refresh_token_expiry_secs,
        state.config.oauth_refresh_token_expiry_secs,
        state.config.password_reset_expiry_secs,
    )
}

/// POST /auth/register
pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = auth_service(&state).register(&req.email, &req.password, &req.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { id: user.id, email: user.email, name: user.name }),
    ))
}

/// POST /auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let selectable = auth_service(&state).login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        selection_token: selectable.selection_token,
        organizations: selectable.organizations,
    }))
}

/// POST /auth/organizations/select
pub async fn select_organization_handler(
    State(state): State<AppState>,
    Json(req): Json<SelectOrganizationRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let pair = auth_service(&state).select_organization(&req.selection_token, req.organization_id).await?;
    Ok(Json(pair.into()))
}

/// POST /auth/organizations
pub async fn create_organization_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let pair = auth_service(&state)
        .create_organization(&req.selection_token, &req.name, req.slug.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(pair.into())))
}

/// POST /auth/refresh
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let pair = auth_service(&state).refresh(&req.refresh_token).await?;
    Ok(Json(pair.into()))
}

/// POST /auth/logout
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service(&state).logout(&req.refresh_token).await?;
    Ok(Json(MessageResponse::new("logged out")))
}

/// POST /auth/password/forgot
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // The returned token is for the (external) email-delivery collaborator;
    // the response never reveals whether the address exists.
    let _ = auth_service(&state).forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new("if the email exists, a reset link has been sent")))
}

/// POST /auth/password/reset
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service(&state).reset_password(&req.token, &req.new_password).await?;
    Ok(Json(MessageResponse::new("password has been reset")))
}

/// POST /auth/password/change
pub async fn change_password_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service(&state)
        .change_password(ctx.user_id()?, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::new("password changed")))
}

/// GET /users/me
pub async fn get_profile_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = auth_service(&state).get_profile(ctx.user_id()?).await?;
    Ok(Json(user.into()))
}

/// PUT /users/me
pub async fn update_profile_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = auth_service(&state).update_profile(ctx.user_id()?, &req.name).await?;
    Ok(Json(user.into()))
}
