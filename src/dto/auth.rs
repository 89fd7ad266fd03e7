use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::OrganizationSummary;

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: a short-lived selection token plus the organizations the
/// user may select into.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub selection_token: String,
    pub organizations: Vec<OrganizationSummary>,
}

/// Organization selection request
#[derive(Debug, Deserialize)]
pub struct SelectOrganizationRequest {
    pub selection_token: String,
    pub organization_id: Uuid,
}

/// Create-organization request, the alternate path off the selection step
#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub selection_token: String,
    pub name: String,
    pub slug: Option<String>,
}

/// Login/selection/refresh response with tokens
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<crate::utils::token::TokenPair> for TokenResponse {
    fn from(pair: crate::utils::token::TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }
    }
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Forgot password request
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset password request
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Change password request, for an authenticated user
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// User profile response for GET /users/me. Excludes password_hash.
#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_superadmin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::User> for UserProfileResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            is_superadmin: user.is_superadmin,
            created_at: user.created_at,
        }
    }
}

/// Update-profile request; only the display name can be changed
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}
