//! Validation of user credential input
//!
//! Every rule here runs before the credential store is touched, so a request
//! that fails validation never causes a write.

use crate::core::db::models::Role;

/// Longest password bcrypt hashes without truncation, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Field-level validation failures. Messages are safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid email")]
    InvalidEmail,

    #[error("invalid first_name field")]
    InvalidFirstName,

    #[error("invalid last_name field")]
    InvalidLastName,

    #[error("invalid password field")]
    InvalidPassword,

    #[error("invalid role field")]
    InvalidRole,
}

impl ValidationError {
    /// Name of the offending request field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidEmail => "email",
            ValidationError::InvalidFirstName => "first_name",
            ValidationError::InvalidLastName => "last_name",
            ValidationError::InvalidPassword => "password",
            ValidationError::InvalidRole => "role",
        }
    }
}

/// Validate email format: `local@domain.tld`, no whitespace
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    if !domain.contains('.') || domain.split('.').any(|p| p.is_empty()) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

pub fn validate_first_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidFirstName);
    }
    Ok(())
}

pub fn validate_last_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidLastName);
    }
    Ok(())
}

/// Passwords must be non-blank and fit in `MAX_PASSWORD_BYTES`
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() || password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::InvalidPassword);
    }
    Ok(())
}

/// Parse a role name, rejecting anything outside the allowed set
pub fn validate_role(role: &str) -> Result<Role, ValidationError> {
    role.parse().map_err(|_| ValidationError::InvalidRole)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name@example.com").is_ok());
        assert!(validate_email("user+tag@example.co.uk").is_ok());
        assert!(validate_email("a@b.com").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert_eq!(validate_email(""), Err(ValidationError::InvalidEmail));
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@example").is_err());
        assert!(validate_email("user@@example.com").is_err());
        assert!(validate_email("user@.com").is_err());
        assert!(validate_email("user@example.").is_err());
        assert!(validate_email("us er@example.com").is_err());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_first_name("Ada").is_ok());
        assert_eq!(
            validate_first_name("   "),
            Err(ValidationError::InvalidFirstName)
        );
        assert!(validate_last_name("Lovelace").is_ok());
        assert_eq!(validate_last_name(""), Err(ValidationError::InvalidLastName));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret123").is_ok());
        assert_eq!(
            validate_password(" \t"),
            Err(ValidationError::InvalidPassword)
        );
    }

    #[test]
    fn test_validate_password_length_is_in_bytes() {
        assert!(validate_password(&"a".repeat(72)).is_ok());
        assert_eq!(
            validate_password(&"a".repeat(73)),
            Err(ValidationError::InvalidPassword)
        );
        // 37 two-byte chars: 74 bytes
        assert_eq!(
            validate_password(&"é".repeat(37)),
            Err(ValidationError::InvalidPassword)
        );
    }

    #[test]
    fn test_validate_role() {
        assert_eq!(validate_role("admin"), Ok(Role::Admin));
        assert_eq!(validate_role("manager"), Ok(Role::Manager));
        assert_eq!(validate_role("Admin"), Err(ValidationError::InvalidRole));
        assert_eq!(validate_role("viewer"), Err(ValidationError::InvalidRole));
    }

    #[test]
    fn test_validation_error_field_detail() {
        assert_eq!(ValidationError::InvalidEmail.field(), "email");
        assert_eq!(ValidationError::InvalidRole.field(), "role");
        assert_eq!(ValidationError::InvalidEmail.to_string(), "invalid email");
        assert_eq!(
            ValidationError::InvalidLastName.to_string(),
            "invalid last_name field"
        );
    }
}
