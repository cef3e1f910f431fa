//! Email address validation shared by signup, login and token signing.

use thiserror::Error;

/// Shortest accepted address (`a@b` plus a dot in the domain still has to fit).
const MIN_EMAIL_LEN: usize = 3;

/// RFC 5321 path limit minus the angle brackets.
const MAX_EMAIL_LEN: usize = 254;

/// Characters that may not appear unquoted in the local part.
const LOCAL_PART_FORBIDDEN: &str = "()<>[]:;@\\,\" ";

/// Reasons an email address is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("invalid email length")]
    Length,

    #[error("invalid email format")]
    Format,

    #[error("invalid characters in local part")]
    LocalPart,

    #[error("invalid domain")]
    Domain,
}

/// Validate an email address.
///
/// Accepts `local@domain` where the whole address is 3-254 bytes, the `@` appears exactly
/// once and is neither first nor last, the local part has no control characters, spaces
/// or `()<>[]:;@\,"` and does not start or end with `.`, and the domain is made of ASCII
/// letters, digits, hyphens and at least one interior dot.
///
/// # Examples
///
/// ```
/// use taskdeck::auth::{validate_email, EmailError};
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert_eq!(validate_email("invalid.com"), Err(EmailError::Format));
/// ```
pub fn validate_email(email: &str) -> Result<(), EmailError> {
    if email.len() < MIN_EMAIL_LEN || email.len() > MAX_EMAIL_LEN {
        return Err(EmailError::Length);
    }

    let (local, domain) = email.split_once('@').ok_or(EmailError::Format)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(EmailError::Format);
    }

    if !is_local_part_valid(local) {
        return Err(EmailError::LocalPart);
    }

    if !is_domain_valid(domain) {
        return Err(EmailError::Domain);
    }

    Ok(())
}

fn is_local_part_valid(local: &str) -> bool {
    if local.starts_with('.') || local.ends_with('.') {
        return false;
    }

    local
        .chars()
        .all(|c| !c.is_ascii_control() && !LOCAL_PART_FORBIDDEN.contains(c))
}

fn is_domain_valid(domain: &str) -> bool {
    if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
        return false;
    }

    domain
        .chars()
        .all(|c| c == '.' || c == '-' || c.is_ascii_alphanumeric())
}
