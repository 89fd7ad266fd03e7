mod config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod models;
mod repositories;
mod services;
mod utils;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::mysql::MySqlPoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppState, Config};
use crate::handlers::{
    api_key::{create_api_key_handler, get_api_key_handler, list_api_keys_handler, revoke_api_key_handler},
    auth::{
        change_password_handler, create_organization_handler, forgot_password_handler,
        get_profile_handler, login_handler, logout_handler, refresh_handler, register_handler,
        reset_password_handler, select_organization_handler, update_profile_handler,
    },
    client_app::{create_client_app_handler, get_client_app_handler, list_client_apps_handler},
    health::{liveness_handler, readiness_handler},
    invitation::{
        accept_invitation_handler, create_invitation_handler, list_invitations_handler,
        resend_invitation_handler, revoke_invitation_handler,
    },
    oauth::{
        authorize_callback_handler, authorize_handler, revoke_handler, token_handler,
        userinfo_handler,
    },
    organization::{get_organization_handler, list_members_handler},
    rbac::{
        assign_permission_handler, assign_role_handler, create_permission_handler,
        create_role_handler, create_system_permission_handler, create_system_role_handler,
        effective_permissions_handler, list_permissions_handler, list_roles_handler,
        list_system_permissions_handler, list_system_roles_handler, revoke_permission_handler,
    },
};
use crate::middleware::{
    api_call_rate_limit, auth_middleware, login_rate_limit, oauth_token_rate_limit,
    password_reset_rate_limit, registration_rate_limit, token_refresh_rate_limit,
};

/// Builds the full router: public auth/OAuth2 routes, bearer-protected
/// organization/RBAC/client-app/API-key routes, and the liveness/readiness
/// probes.
pub fn create_router(state: AppState) -> Router {
    let auth_public_routes = Router::new()
        .route("/register", post(register_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), registration_rate_limit))
        .route("/login", post(login_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), login_rate_limit))
        .route("/organizations/select", post(select_organization_handler))
        .route("/organizations", post(create_organization_handler))
        .route("/refresh", post(refresh_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), token_refresh_rate_limit))
        .route("/password/forgot", post(forgot_password_handler))
        .route("/password/reset", post(reset_password_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), password_reset_rate_limit));

    let auth_protected_routes = Router::new()
        .route("/logout", post(logout_handler))
        .route("/password/change", post(change_password_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let user_routes = Router::new()
        .route("/me", get(get_profile_handler).put(update_profile_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let organization_routes = Router::new()
        .route("/:org_id", get(get_organization_handler))
        .route("/:org_id/members", get(list_members_handler))
        .route(
            "/:org_id/invitations",
            post(create_invitation_handler).get(list_invitations_handler),
        )
        .route("/:org_id/invitations/:invitation_id", delete(revoke_invitation_handler))
        .route("/:org_id/invitations/:invitation_id/resend", post(resend_invitation_handler))
        .route("/:org_id/roles", post(create_role_handler).get(list_roles_handler))
        .route(
            "/:org_id/permissions",
            post(create_permission_handler).get(list_permissions_handler),
        )
        .route("/:org_id/role-assignments", post(assign_role_handler))
        .route("/:org_id/users/:user_id/permissions", get(effective_permissions_handler))
        .route(
            "/:org_id/client-apps",
            post(create_client_app_handler).get(list_client_apps_handler),
        )
        .route("/:org_id/client-apps/:client_app_id", get(get_client_app_handler))
        .route(
            "/:org_id/dev/api-keys",
            post(create_api_key_handler).get(list_api_keys_handler),
        )
        .route("/:org_id/dev/api-keys/:key_id", get(get_api_key_handler).delete(revoke_api_key_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let role_routes = Router::new()
        .route("/:role_id/permissions", post(assign_permission_handler))
        .route("/:role_id/permissions/:permission_id", delete(revoke_permission_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let invitation_routes = Router::new()
        .route("/accept", post(accept_invitation_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/rbac/roles", post(create_system_role_handler).get(list_system_roles_handler))
        .route(
            "/rbac/permissions",
            post(create_system_permission_handler).get(list_system_permissions_handler),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let oauth_routes = Router::new()
        .route("/authorize", get(authorize_handler).post(authorize_handler))
        .route("/authorize/callback", post(authorize_callback_handler))
        .route("/token", post(token_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), oauth_token_rate_limit))
        .route("/revoke", post(revoke_handler))
        .route(
            "/userinfo",
            get(userinfo_handler).layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let health_routes = Router::new()
        .route("/live", get(liveness_handler))
        .route("/ready", get(readiness_handler));

    let api_v1 = Router::new()
        .nest("/auth", auth_public_routes)
        .nest("/auth", auth_protected_routes)
        .nest("/users", user_routes)
        .nest("/organizations", organization_routes)
        .nest("/roles", role_routes)
        .nest("/invitations", invitation_routes)
        .nest("/admin", admin_routes)
        .nest("/oauth", oauth_routes);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .layer(axum_middleware::from_fn_with_state(state.clone(), api_call_rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .max_age(Duration::from_secs(3600)),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    let addr = config.socket_addr();
    let state = AppState::new(pool, config);
    let app = create_router(state);

    tracing::info!("identity server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl+c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received ctrl+c, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received sigterm, starting graceful shutdown");
        },
    }
}
