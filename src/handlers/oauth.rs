//! OAuth2 authorization-code grant (mandatory PKCE) plus refresh, revoke,
//! and userinfo endpoints.

use axum::{
    extract::{Query, State},
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::config::AppState;
use crate::dto::oauth::{
    AuthorizationRequest, ConsentRequest, OAuthErrorResponse, OAuthTokenResponseDto, RevokeRequest,
    TokenRequest, UserInfoResponse,
};
use crate::error::OAuthError;
use crate::middleware::csrf::{issue_csrf_cookie, verify_csrf};
use crate::middleware::AuthContext;
use crate::repositories::{MembershipRepository, UserRepository};
use crate::services::OAuthService;
use crate::utils::password::verify_password;

fn oauth_service(state: &AppState) -> OAuthService {
    OAuthService::new(
        state.pool.clone(),
        state.token_manager.clone(),
        state.config.authorization_code_expiry_secs,
        state.config.oauth_refresh_token_expiry_secs,
    )
}

/// GET/POST /oauth/authorize. Validates the request up front so a malformed
/// client_id or redirect_uri never produces a redirect to an attacker-chosen
/// URI; once the redirect target itself is trusted, further errors are
/// reported by redirecting back to it per RFC 6749 §4.1.2.1.
///
/// If the caller already holds a valid access token for a member of the
/// client's organization, the code is issued immediately and the consent
/// step is skipped — unless `prompt=login` is present, which always forces
/// the credentials flow at the callback endpoint below.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Query(req): Query<AuthorizationRequest>,
    headers: HeaderMap,
) -> Response {
    let service = oauth_service(&state);

    let client = match service.find_client(&req.client_id).await {
        Ok(client) => client,
        Err(e) => return oauth_error_response(&e),
    };

    if let Err(e) = service.validate_authorization_request(
        &client,
        &req.redirect_uri,
        &req.response_type,
        &req.code_challenge,
        &req.code_challenge_method,
    ) {
        return match &e {
            OAuthError::InvalidRequest(_) | OAuthError::UnsupportedGrantType(_) => oauth_error_response(&e),
            _ => error_redirect(&req.redirect_uri, &e, req.state.as_deref()),
        };
    }

    let force_login = req.prompt.as_deref() == Some("login");
    if !force_login {
        if let Some(session) = existing_session(&state, &headers, &client).await {
            let scope = req.scope.clone().unwrap_or_default();
            return match service
                .create_authorization_code(
                    &client,
                    session,
                    client.organization_id,
                    &req.redirect_uri,
                    &scope,
                    &req.code_challenge,
                    &req.code_challenge_method,
                )
                .await
            {
                Ok(code) => redirect_with_code(&req.redirect_uri, &code, req.state.as_deref()),
                Err(e) => error_redirect(&req.redirect_uri, &e, req.state.as_deref()),
            };
        }
    }

    // No usable session (or re-authentication was requested); everything
    // past this point redirects back to the client on failure. The caller
    // collects credentials out-of-band and completes the flow at the
    // callback below.
    let (csrf_token, cookie) = issue_csrf_cookie(state.config.csrf_token_expiry_secs);
    let mut response = Json(serde_json::json!({
        "client_name": client.name,
        "scope": req.scope,
        "csrf_token": csrf_token,
    }))
    .into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    response
}

/// Resolves a bearer token on the request, if any, to a user id already a
/// member of the client's organization — the condition under which
/// `authorize_handler` can skip straight to code issuance.
async fn existing_session(state: &AppState, headers: &HeaderMap, client: &crate::models::ClientApp) -> Option<uuid::Uuid> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())?;

    let claims = state.token_manager.verify_access_token(token).ok()?;
    let user_id = claims.user_id().ok()?;

    let membership_repo = MembershipRepository::new(state.pool.clone());
    if membership_repo.exists(user_id, client.organization_id).await.unwrap_or(false) {
        Some(user_id)
    } else {
        None
    }
}

fn redirect_with_code(redirect_uri: &str, code: &str, state_param: Option<&str>) -> Response {
    let mut redirect_url = redirect_uri.to_string();
    redirect_url.push_str(if redirect_url.contains('?') { "&" } else { "?" });
    redirect_url.push_str(&format!("code={}", urlencoding::encode(code)));
    if let Some(state_param) = state_param {
        redirect_url.push_str(&format!("&state={}", urlencoding::encode(state_param)));
    }
    Redirect::temporary(&redirect_url).into_response()
}

/// POST /oauth/authorize/callback. Authenticates the resource owner and, on
/// success, mints an authorization code and redirects to the client.
pub async fn authorize_callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConsentRequest>,
) -> Response {
    if verify_csrf(&headers, &req.csrf_token).is_err() {
        return error_redirect(
            &req.redirect_uri,
            &OAuthError::InvalidRequest("csrf_token is invalid or expired".to_string()),
            req.state.as_deref(),
        );
    }

    let service = oauth_service(&state);

    let client = match service.find_client(&req.client_id).await {
        Ok(client) => client,
        Err(e) => return oauth_error_response(&e),
    };

    if let Err(e) = service.validate_authorization_request(
        &client,
        &req.redirect_uri,
        "code",
        &req.code_challenge,
        &req.code_challenge_method,
    ) {
        return error_redirect(&req.redirect_uri, &e, req.state.as_deref());
    }

    let user_repo = UserRepository::new(state.pool.clone());
    let membership_repo = MembershipRepository::new(state.pool.clone());

    let user_record = match user_repo.find_by_email(&req.email).await {
        Ok(Some(u)) => u,
        _ => {
            return error_redirect(
                &req.redirect_uri,
                &OAuthError::AccessDenied("invalid credentials".to_string()),
                req.state.as_deref(),
            )
        }
    };

    if !user_record.is_active || !verify_password(&req.password, &user_record.password_hash).unwrap_or(false) {
        return error_redirect(
            &req.redirect_uri,
            &OAuthError::AccessDenied("invalid credentials".to_string()),
            req.state.as_deref(),
        );
    }

    let organizations = match membership_repo.list_for_user(user_record.id).await {
        Ok(orgs) => orgs,
        Err(e) => return error_redirect(&req.redirect_uri, &OAuthError::ServerError(e.to_string()), req.state.as_deref()),
    };
    let is_member_of_client_org = organizations
        .iter()
        .any(|org| org.organization_id == client.organization_id);
    if !is_member_of_client_org {
        return error_redirect(
            &req.redirect_uri,
            &OAuthError::AccessDenied("account is not a member of this client's organization".to_string()),
            req.state.as_deref(),
        );
    }

    let scope = req.scope.clone().unwrap_or_default();
    let code = match service
        .create_authorization_code(
            &client,
            user_record.id,
            client.organization_id,
            &req.redirect_uri,
            &scope,
            &req.code_challenge,
            &req.code_challenge_method,
        )
        .await
    {
        Ok(code) => code,
        Err(e) => return error_redirect(&req.redirect_uri, &e, req.state.as_deref()),
    };

    redirect_with_code(&req.redirect_uri, &code, req.state.as_deref())
}

/// POST /oauth/token. `authorization_code` and `refresh_token` are the only
/// supported grant types.
pub async fn token_handler(
    State(state): State<AppState>,
    axum::Form(req): axum::Form<TokenRequest>,
) -> Result<Json<OAuthTokenResponseDto>, OAuthError> {
    let service = oauth_service(&state);

    let response = match req.grant_type.as_str() {
        "authorization_code" => {
            let code = req.code.ok_or_else(|| OAuthError::InvalidRequest("code is required".to_string()))?;
            let client_id = req
                .client_id
                .ok_or_else(|| OAuthError::InvalidRequest("client_id is required".to_string()))?;
            let redirect_uri = req
                .redirect_uri
                .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;
            let code_verifier = req
                .code_verifier
                .ok_or_else(|| OAuthError::InvalidRequest("code_verifier is required".to_string()))?;

            service
                .exchange_code_for_tokens(&code, &client_id, req.client_secret.as_deref(), &redirect_uri, &code_verifier)
                .await?
        }
        "refresh_token" => {
            let refresh_token = req
                .refresh_token
                .ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".to_string()))?;
            let client_id = req
                .client_id
                .ok_or_else(|| OAuthError::InvalidRequest("client_id is required".to_string()))?;

            service
                .refresh_token_grant(&refresh_token, &client_id, req.client_secret.as_deref(), req.scope.as_deref())
                .await?
        }
        other => return Err(OAuthError::UnsupportedGrantType(format!("unsupported grant_type: {other}"))),
    };

    Ok(Json(response.into()))
}

/// POST /oauth/logout. Per RFC 7009, always returns 200 — invalid or
/// already-revoked tokens are not reported as errors.
pub async fn revoke_handler(State(state): State<AppState>, axum::Form(req): axum::Form<RevokeRequest>) -> StatusCode {
    let _ = oauth_service(&state).revoke(&req.token, req.token_type_hint.as_deref()).await;
    StatusCode::OK
}

/// GET /oauth/userinfo
pub async fn userinfo_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<UserInfoResponse>, OAuthError> {
    let info = oauth_service(&state).userinfo(&ctx.0).await?;
    Ok(Json(UserInfoResponse {
        sub: info.sub.to_string(),
        email: info.email,
        org: info.org.map(|id| id.to_string()),
        roles: info.roles,
        permissions: info.permissions,
    }))
}

fn oauth_error_response(error: &OAuthError) -> Response {
    let body: OAuthErrorResponse = error.into();
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn error_redirect(redirect_uri: &str, error: &OAuthError, state: Option<&str>) -> Response {
    let mut url = redirect_uri.to_string();
    url.push_str(if url.contains('?') { "&" } else { "?" });
    url.push_str(&format!(
        "error={}&error_description={}",
        urlencoding::encode(error.code()),
        urlencoding::encode(&error.description())
    ));
    if let Some(s) = state {
        url.push_str(&format!("&state={}", urlencoding::encode(s)));
    }
    Redirect::temporary(&url).into_response()
}
