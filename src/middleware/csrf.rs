use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::error::AppError;
use crate::utils::secret::{generate_opaque_token, hash_opaque_token, verify_opaque_token};

/// Cookie carrying the CSRF token for the HTML consent-form variant of
/// `/oauth/authorize/callback`. Host-only, `SameSite=Strict`, cleared on a
/// successful submission.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";
/// Form field / header the token must also be echoed in.
pub const CSRF_FIELD_NAME: &str = "csrf_token";

/// Issue a fresh CSRF token and its `Set-Cookie` header value. The token
/// itself (not its hash) is what the form echoes back; only its hash is
/// meaningful to compare, mirroring the opaque-token pattern used for every
/// other bearer secret in the system.
pub fn issue_csrf_cookie(expiry_secs: i64) -> (String, HeaderValue) {
    let token = generate_opaque_token();
    let cookie = format!(
        "{CSRF_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={expiry_secs}"
    );
    (
        token,
        HeaderValue::from_str(&cookie).expect("generated cookie value is always valid ASCII"),
    )
}

/// `Set-Cookie` header that immediately expires the CSRF cookie.
pub fn clear_csrf_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "csrf_token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0",
    )
}

/// Verify that the token echoed in the request body matches the one issued
/// in the cookie. Both must be present and equal; there is no stored digest
/// to check against because the cookie itself is the secret the server
/// handed out — equality with the submitted value is the whole check.
pub fn verify_csrf(headers: &HeaderMap, submitted_token: &str) -> Result<(), AppError> {
    let cookie_token = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';').find_map(|kv| {
                let (k, v) = kv.trim().split_once('=')?;
                (k == CSRF_COOKIE_NAME).then(|| v.to_string())
            })
        })
        .ok_or(AppError::Forbidden)?;

    if submitted_token.is_empty() || !verify_opaque_token(&cookie_token, &hash_opaque_token(submitted_token)) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[allow(dead_code)]
pub(crate) fn set_cookie_header_name() -> axum::http::HeaderName {
    SET_COOKIE
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn issued_cookie_round_trips_through_verify() {
        let (token, cookie_value) = issue_csrf_cookie(600);
        let mut headers = HeaderMap::new();
        // Strip the attributes a real cookie jar would, leaving just the pair.
        let pair = cookie_value.to_str().unwrap().split(';').next().unwrap();
        headers.insert(COOKIE, HeaderValue::from_str(pair).unwrap());

        assert!(verify_csrf(&headers, &token).is_ok());
        assert!(verify_csrf(&headers, "wrong-token").is_err());
    }

    #[test]
    fn missing_cookie_is_rejected() {
        let headers = HeaderMap::new();
        assert!(verify_csrf(&headers, "anything").is_err());
    }
}
