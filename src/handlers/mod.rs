pub mod api_key;
pub mod auth;
pub mod client_app;
pub mod health;
pub mod invitation;
pub mod oauth;
pub mod organization;
pub mod rbac;
