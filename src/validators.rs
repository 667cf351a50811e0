/// Input validators for the registration and sign-in payloads.
///
/// Length limits guard against oversized inputs; the email format check is a
/// practical RFC 5322 subset.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address and returns its trimmed form.
pub fn is_valid_email(email: &str) -> Result<String, AppError> {
    let trimmed = email.trim();

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(AppError::bad_request("email is too short"));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::bad_request("email is too long"));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(AppError::bad_request("email has invalid format"));
    }

    Ok(trimmed.to_string())
}

/// Validates a display name and returns its trimmed form.
pub fn is_valid_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(AppError::bad_request("name is empty"));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(AppError::bad_request("name is too long"));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        for email in ["user@example.com", "first.last@sub.example.org"] {
            assert!(is_valid_email(email).is_ok(), "should accept {}", email);
        }
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["notanemail", "user@", "@example.com", "user@@example.com"] {
            assert!(is_valid_email(email).is_err(), "should reject {}", email);
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(
            is_valid_email("  user@example.com  ").unwrap(),
            "user@example.com"
        );
        assert_eq!(is_valid_name("  John Doe ").unwrap(), "John Doe");
    }

    #[test]
    fn rejects_empty_name() {
        assert!(is_valid_name("   ").is_err());
    }
}
