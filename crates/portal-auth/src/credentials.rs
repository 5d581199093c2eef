//! Sign-in form checks applied before the provider is contacted.

use crate::{AuthError, AuthResult};

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Returns the trimmed email when both fields are present.
pub fn validate_sign_in(email: &str, password: &str) -> AuthResult<String> {
    let email = email.trim();
    let mut missing = Vec::new();
    if email.is_empty() {
        missing.push("email");
    }
    if password.is_empty() {
        missing.push("password");
    }
    if !missing.is_empty() {
        return Err(AuthError::MissingFields(missing.join(", ")));
    }
    Ok(email.to_string())
}

/// Sign-in checks plus the minimum password length.
pub fn validate_sign_up(email: &str, password: &str) -> AuthResult<String> {
    let email = validate_sign_in(email, password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_lists_both() {
        match validate_sign_in("  ", "") {
            Err(AuthError::MissingFields(fields)) => assert_eq!(fields, "email, password"),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_sign_in_trims_email_and_skips_length_check() {
        assert_eq!(validate_sign_in(" doc@clinic.in ", "abc").unwrap(), "doc@clinic.in");
    }

    #[test]
    fn test_sign_up_rejects_short_password() {
        assert!(matches!(
            validate_sign_up("doc@clinic.in", "12345"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_sign_up("doc@clinic.in", "123456").is_ok());
    }

    #[test]
    fn test_sign_up_reports_missing_before_weak() {
        assert!(matches!(
            validate_sign_up("", "1"),
            Err(AuthError::MissingFields(_))
        ));
    }
}
