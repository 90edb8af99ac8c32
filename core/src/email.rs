use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

/// Loose client-side shape check, not RFC 5322.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

/// Strip every whitespace character. Idempotent.
pub fn sanitize_email(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Sanitize and validate a manually entered email.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = sanitize_email(raw);
    if email.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !is_valid_email(&email) {
        return Err(ValidationError::Malformed { received: email });
    }
    Ok(email)
}
