pub mod api_key;
pub mod auth;
pub mod client_app;
pub mod common;
pub mod invitation;
pub mod oauth;
pub mod organization;
pub mod rbac;

pub use api_key::*;
pub use auth::*;
pub use client_app::*;
pub use common::*;
pub use invitation::*;
pub use oauth::*;
pub use organization::*;
pub use rbac::*;
