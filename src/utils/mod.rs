pub mod password;
pub mod pkce;
pub mod secret;
pub mod token;
pub mod validation;
