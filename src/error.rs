use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform response envelope used by every non-OAuth endpoint.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl Envelope<()> {
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            errors: None,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            errors: None,
        }
    }
}

/// General-purpose application error covering every endpoint that is not part
/// of the OAuth2 surface (which has its own `error`/`error_description` shape).
#[allow(dead_code)]
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("account is inactive")]
    UserInactive,

    #[error("not permitted")]
    Forbidden,

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("{resource} already exists")]
    Conflict { resource: &'static str },

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: i64 },

    #[error("cross-organization assignment denied")]
    CrossOrgAssignmentDenied,

    #[error("custom permission cannot be assigned to a system role")]
    SystemRoleCustomPermissionDenied,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::UserInactive => (StatusCode::FORBIDDEN, "user_inactive"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::CrossOrgAssignmentDenied => {
                (StatusCode::BAD_REQUEST, "cross_org_assignment_denied")
            }
            AppError::SystemRoleCustomPermissionDenied => {
                (StatusCode::BAD_REQUEST, "system_role_custom_permission_denied")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if let AppError::Internal(ref e) = self {
            tracing::error!(error = %e, "internal error");
        }

        let errors = match &self {
            AppError::Validation { field, message } => Some(serde_json::json!({
                "field": field,
                "code": code,
                "message": message,
            })),
            AppError::RateLimited { retry_after_secs } => Some(serde_json::json!({
                "code": code,
                "retry_after_secs": retry_after_secs,
            })),
            _ => Some(serde_json::json!({ "code": code })),
        };

        let body = Envelope::<()> {
            success: false,
            data: None,
            message: Some(self.to_string()),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// OAuth2 error kinds, mapped onto the standard `error`/`error_description`
/// response shape (RFC 6749 §5.2 / §4.1.2.1).
#[allow(dead_code)]
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidClient(String),

    #[error("{0}")]
    InvalidGrant(String),

    #[error("{0}")]
    UnauthorizedClient(String),

    #[error("{0}")]
    UnsupportedGrantType(String),

    #[error("{0}")]
    InvalidScope(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    ServerError(String),
}

impl OAuthError {
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::UnauthorizedClient(_) => "unauthorized_client",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::AccessDenied(_) => "access_denied",
            OAuthError::ServerError(_) => "server_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            OAuthError::AccessDenied(_) => StatusCode::FORBIDDEN,
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn description(&self) -> String {
        match self {
            OAuthError::InvalidRequest(m)
            | OAuthError::InvalidClient(m)
            | OAuthError::InvalidGrant(m)
            | OAuthError::UnauthorizedClient(m)
            | OAuthError::UnsupportedGrantType(m)
            | OAuthError::InvalidScope(m)
            | OAuthError::AccessDenied(m)
            | OAuthError::ServerError(m) => m.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct OAuthErrorBody {
    pub error: &'static str,
    pub error_description: String,
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if let OAuthError::ServerError(ref m) = self {
            tracing::error!(error = %m, "oauth server error");
        }
        let status = self.status();
        let body = OAuthErrorBody {
            error: self.code(),
            error_description: self.description(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for OAuthError {
    fn from(e: anyhow::Error) -> Self {
        OAuthError::ServerError(e.to_string())
    }
}

/// Repository/service failures surfacing through the OAuth2 surface always
/// collapse to `server_error` — callers that need a specific RFC 6749 error
/// code construct it before the `AppError` is raised (unknown client, bad
/// grant, etc.), not after converting one.
impl From<AppError> for OAuthError {
    fn from(e: AppError) -> Self {
        OAuthError::ServerError(e.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(anyhow::anyhow!(e))
    }
}

impl From<sqlx::Error> for OAuthError {
    fn from(e: sqlx::Error) -> Self {
        OAuthError::ServerError(e.to_string())
    }
}
