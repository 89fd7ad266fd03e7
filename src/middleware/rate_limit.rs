use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::config::AppState;
use crate::error::AppError;
use crate::services::{RateLimitConfig, RateLimiterService};

/// Rate-limits a request by client IP against a fixed `(scope, config)` pair.
/// Disabled entirely when `config.rate_limiter_enabled` is false. Intended to
/// be layered per-route with [`axum::middleware::from_fn_with_state`] plus a
/// closure binding `scope`/`config`, matching the teacher's per-endpoint
/// `RateLimitConfig::login()`-style presets.
pub async fn rate_limit_middleware(
    scope: &'static str,
    config: RateLimitConfig,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.rate_limiter_enabled {
        return Ok(next.run(request).await);
    }

    let identifier = RateLimiterService::create_identifier(Some(&addr.ip().to_string()), None);
    let limiter = RateLimiterService::new(state.pool.clone());
    let result = limiter.check_and_increment(&identifier, scope, &config).await?;

    if !result.allowed {
        return Err(AppError::RateLimited {
            retry_after_secs: result.retry_after_seconds.unwrap_or(config.window_seconds),
        });
    }

    Ok(next.run(request).await)
}

/// Builds a per-route rate-limit layer bound to a specific scope/config pair.
/// Usage: `.layer(middleware::from_fn_with_state(state.clone(), login_rate_limit))`.
macro_rules! scoped_rate_limiter {
    ($name:ident, $scope:literal, $preset:expr) => {
        pub async fn $name(
            state: State<AppState>,
            addr: ConnectInfo<SocketAddr>,
            request: Request<Body>,
            next: Next,
        ) -> Result<Response, AppError> {
            let config = RateLimitConfig::from_tuple($preset(&state.config));
            rate_limit_middleware($scope, config, state, addr, request, next).await
        }
    };
}

scoped_rate_limiter!(login_rate_limit, "login", |c: &crate::config::Config| c.rate_limit_login);
scoped_rate_limiter!(registration_rate_limit, "registration", |c: &crate::config::Config| c
    .rate_limit_registration);
scoped_rate_limiter!(password_reset_rate_limit, "password_reset", |c: &crate::config::Config| c
    .rate_limit_password_reset);
scoped_rate_limiter!(token_refresh_rate_limit, "token_refresh", |c: &crate::config::Config| c
    .rate_limit_token_refresh);
scoped_rate_limiter!(oauth_token_rate_limit, "oauth_token", |c: &crate::config::Config| c
    .rate_limit_oauth_token);
scoped_rate_limiter!(api_call_rate_limit, "api_call", |c: &crate::config::Config| c.rate_limit_api_call);
