pub mod api_key_auth;
pub mod auth;
pub mod csrf;
pub mod rate_limit;

pub use csrf::{issue_csrf_cookie, verify_csrf};

pub use api_key_auth::{api_key_auth_middleware, ApiKeyContext};
pub use auth::{auth_middleware, AuthContext};
pub use rate_limit::{
    api_call_rate_limit, login_rate_limit, oauth_token_rate_limit, password_reset_rate_limit,
    registration_rate_limit, token_refresh_rate_limit,
};
