pub mod api_key;
pub mod audit;
pub mod auth;
pub mod client_app;
pub mod invitation;
pub mod oauth;
pub mod rate_limiter;
pub mod rbac;

pub use api_key::{ApiKeyService, IssuedApiKey};
pub use audit::AuditService;
pub use auth::{AuthService, SelectableOrganizations};
pub use client_app::{ClientAppService, IssuedClientApp};
pub use invitation::InvitationService;
pub use oauth::{OAuthService, OAuthTokenResponse, UserInfo};
pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiterService};
pub use rbac::RbacService;
