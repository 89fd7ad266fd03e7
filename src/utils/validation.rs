//! Input validation shared by every handler: email, password strength,
//! display names, and organization slugs. Every failure maps to
//! [`crate::error::AppError::Validation`] so the UI can localize by field.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::AppError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).expect("invalid email regex pattern")
});

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z' -]{1,100}$").expect("invalid name regex pattern"));

static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("invalid slug regex pattern"));

fn validation_err(field: &str, message: impl Into<String>) -> AppError {
    AppError::Validation {
        field: Some(field.to_string()),
        message: message.into(),
    }
}

/// Validate email format and return the case-folded, storage-ready form.
/// Normalization is idempotent: `normalize_email(normalize_email(e)) ==
/// normalize_email(e)`.
pub fn validate_and_normalize_email(email: &str) -> Result<String, AppError> {
    if email.is_empty() || email.len() > 254 {
        return Err(validation_err("email", "invalid email format"));
    }

    if let Some(at_pos) = email.find('@') {
        let local_part = &email[..at_pos];
        if local_part.len() > 64
            || local_part.starts_with('.')
            || local_part.ends_with('.')
            || local_part.contains("..")
        {
            return Err(validation_err("email", "invalid email format"));
        }
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(validation_err("email", "invalid email format"));
    }

    Ok(email.to_lowercase())
}

/// Password strength: length >= 8, and at least one upper, lower, digit, and
/// special character.
pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(validation_err("password", "must be at least 8 characters"));
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(validation_err(
            "password",
            "must contain an uppercase letter, a lowercase letter, a digit, and a special character",
        ));
    }

    Ok(())
}

/// Display name: 1-100 characters, letters/spaces/hyphens/apostrophes.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if !NAME_REGEX.is_match(name) {
        return Err(validation_err(
            "name",
            "must be 1-100 characters containing only letters, spaces, hyphens, or apostrophes",
        ));
    }
    Ok(())
}

/// Organization slug: lowercase alphanumeric segments joined by single
/// hyphens.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if !SLUG_REGEX.is_match(slug) {
        return Err(validation_err(
            "slug",
            "must be lowercase alphanumeric segments separated by single hyphens",
        ));
    }
    Ok(())
}

/// Derive a slug from a display name: lower-case, collapse runs of
/// non-alphanumeric characters to a single hyphen, trim leading/trailing
/// hyphens. Idempotent once the input is already a valid slug.
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    let mut last_was_hyphen = false;

    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_hyphen = false;
        } else if !last_was_hyphen && !slug.is_empty() {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_emails() {
        for email in [
            "test@example.com",
            "user.name@domain.org",
            "user+tag@example.co.uk",
            "_______@example.com",
        ] {
            assert!(validate_and_normalize_email(email).is_ok(), "{email}");
        }
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in [
            "",
            "plainaddress",
            "@no-local-part.com",
            "no-domain@",
            "spaces in@email.com",
            ".email@domain.com",
            "email.@domain.com",
            "email..email@domain.com",
        ] {
            assert!(validate_and_normalize_email(email).is_err(), "{email}");
        }
    }

    #[test]
    fn normalizes_case_and_is_idempotent() {
        let normalized = validate_and_normalize_email("Alice@Example.COM").unwrap();
        assert_eq!(normalized, "alice@example.com");
        assert_eq!(
            validate_and_normalize_email(&normalized).unwrap(),
            normalized
        );
    }

    #[test]
    fn password_requires_all_character_classes() {
        assert!(validate_password_strength("Aa1!aaaa").is_ok());
        assert!(validate_password_strength("short1!").is_err());
        assert!(validate_password_strength("alllowercase1!").is_err());
        assert!(validate_password_strength("ALLUPPERCASE1!").is_err());
        assert!(validate_password_strength("NoDigitsHere!").is_err());
        assert!(validate_password_strength("NoSpecialChars1").is_err());
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Acme Corp!!"), "acme-corp");
        assert_eq!(slugify("  Weird__Name--2 "), "weird-name-2");
        assert_eq!(slugify(&slugify("Acme Corp")), slugify("Acme Corp"));
    }

    #[test]
    fn slug_regex_matches_generated_slugs() {
        assert!(validate_slug(&slugify("Acme Corp")).is_ok());
        assert!(validate_slug("not valid").is_err());
        assert!(validate_slug("-leading-hyphen").is_err());
    }
}
