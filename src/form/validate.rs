//! Field validation rules.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. required and empty (after trimming) → [`FieldError::Required`]
//! 2. `email`, non-empty, not `local@domain.tld` → [`FieldError::InvalidEmail`]
//! 3. `firstName` / `lastName` shorter than [`MIN_NAME_LEN`] characters
//!
//! The email pattern accepts plus-addressing; names only have a length
//! rule.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::options::ValidationMessages;

/// Shortest accepted first or last name, in characters.
pub const MIN_NAME_LEN: usize = 2;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Which rule set applies to a field, derived from its `name` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `name="email"`.
    Email,
    /// `name="firstName"`.
    FirstName,
    /// `name="lastName"`.
    LastName,
    /// Anything else: only the required rule applies.
    Other,
}

impl FieldKind {
    /// Classify a field by its `name` attribute.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("email") => Self::Email,
            Some("firstName") => Self::FirstName,
            Some("lastName") => Self::LastName,
            _ => Self::Other,
        }
    }
}

/// Why a field is invalid. A field carries at most one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Required field left empty.
    Required,
    /// Not a `local@domain.tld` address.
    InvalidEmail,
    /// First name too short.
    FirstNameTooShort,
    /// Last name too short.
    LastNameTooShort,
}

impl FieldError {
    /// The inline message for this error.
    #[must_use]
    pub fn message(self, messages: &ValidationMessages) -> &str {
        match self {
            Self::Required => &messages.required,
            Self::InvalidEmail => &messages.invalid_email,
            Self::FirstNameTooShort => &messages.first_name_too_short,
            Self::LastNameTooShort => &messages.last_name_too_short,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message(&ValidationMessages::default()))
    }
}

/// Whether `value` looks like `local@domain.tld`.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(value))
}

/// Validate one field value.
pub fn validate(
    value: &str,
    kind: FieldKind,
    required: bool,
) -> Result<(), FieldError> {
    let value = value.trim();
    if required && value.is_empty() {
        return Err(FieldError::Required);
    }
    match kind {
        FieldKind::Email if !value.is_empty() && !is_valid_email(value) => {
            Err(FieldError::InvalidEmail)
        }
        FieldKind::FirstName if value.chars().count() < MIN_NAME_LEN => {
            Err(FieldError::FirstNameTooShort)
        }
        FieldKind::LastName if value.chars().count() < MIN_NAME_LEN => {
            Err(FieldError::LastNameTooShort)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_emails_pass() {
        for email in [
            "ada@example.com",
            "first.last@sub.example.ch",
            "dev+meetup@example.io",
            "  padded@example.com  ",
        ] {
            assert_eq!(
                validate(email, FieldKind::Email, true),
                Ok(()),
                "{email}"
            );
        }
    }

    #[test]
    fn emails_without_at_or_domain_dot_fail() {
        for email in [
            "ada.example.com",
            "ada@example",
            "ada@@example.com",
            "@example.com",
            "ada@.",
            "ada @example.com",
        ] {
            assert_eq!(
                validate(email, FieldKind::Email, true),
                Err(FieldError::InvalidEmail),
                "{email}"
            );
        }
    }

    #[test]
    fn short_names_fail_with_length_message() {
        assert_eq!(
            validate("A", FieldKind::FirstName, true),
            Err(FieldError::FirstNameTooShort)
        );
        assert_eq!(
            validate(" B ", FieldKind::LastName, true),
            Err(FieldError::LastNameTooShort)
        );
        assert_eq!(validate("Al", FieldKind::FirstName, true), Ok(()));
        assert_eq!(
            validate("Müller-Lüdenscheidt", FieldKind::LastName, true),
            Ok(())
        );
        // Length counts characters, not bytes.
        assert_eq!(validate("Zoë", FieldKind::FirstName, true), Ok(()));
        assert_eq!(
            validate("é", FieldKind::FirstName, true),
            Err(FieldError::FirstNameTooShort)
        );
    }

    #[test]
    fn required_wins_over_other_rules() {
        assert_eq!(
            validate("   ", FieldKind::Email, true),
            Err(FieldError::Required)
        );
        assert_eq!(
            validate("", FieldKind::FirstName, true),
            Err(FieldError::Required)
        );
        assert_eq!(
            validate("", FieldKind::Other, true),
            Err(FieldError::Required)
        );
    }

    #[test]
    fn optional_fields() {
        assert_eq!(validate("", FieldKind::Email, false), Ok(()));
        assert_eq!(validate("", FieldKind::Other, false), Ok(()));
        // The name rule does not look at required-ness.
        assert_eq!(
            validate("", FieldKind::LastName, false),
            Err(FieldError::LastNameTooShort)
        );
    }

    #[test]
    fn kind_from_name_attribute() {
        assert_eq!(FieldKind::from_name(Some("email")), FieldKind::Email);
        assert_eq!(
            FieldKind::from_name(Some("firstName")),
            FieldKind::FirstName
        );
        assert_eq!(FieldKind::from_name(Some("company")), FieldKind::Other);
        assert_eq!(FieldKind::from_name(None), FieldKind::Other);
    }

    #[test]
    fn messages_are_configurable() {
        let messages = ValidationMessages {
            required: "Pflichtfeld".into(),
            ..ValidationMessages::default()
        };
        assert_eq!(FieldError::Required.message(&messages), "Pflichtfeld");
        assert_eq!(
            FieldError::InvalidEmail.to_string(),
            "Please enter a valid email address"
        );
    }

    mod properties {
        use proptest::prelude::*;

        use crate::form::validate::{validate, FieldError, FieldKind};

        proptest! {
            #[test]
            fn local_at_domain_dot_tld_is_valid(
                local in "[a-z0-9._+-]{1,16}",
                domain in "[a-z0-9-]{1,16}",
                tld in "[a-z]{2,6}"
            ) {
                let email = format!("{local}@{domain}.{tld}");
                prop_assert_eq!(
                    validate(&email, FieldKind::Email, true),
                    Ok(())
                );
            }

            #[test]
            fn values_without_at_are_invalid(value in "[^@\\s]{1,32}") {
                prop_assert_eq!(
                    validate(&value, FieldKind::Email, true),
                    Err(FieldError::InvalidEmail)
                );
            }

            #[test]
            fn domains_without_dot_are_invalid(
                local in "[a-z0-9+]{1,16}",
                domain in "[a-z0-9-]{1,16}"
            ) {
                let email = format!("{local}@{domain}");
                prop_assert_eq!(
                    validate(&email, FieldKind::Email, true),
                    Err(FieldError::InvalidEmail)
                );
            }

            #[test]
            fn one_character_names_fail(name in "[\\p{L}\\p{N}]") {
                prop_assert_eq!(
                    validate(&name, FieldKind::FirstName, true),
                    Err(FieldError::FirstNameTooShort)
                );
                prop_assert_eq!(
                    validate(&name, FieldKind::LastName, true),
                    Err(FieldError::LastNameTooShort)
                );
            }

            #[test]
            fn longer_names_pass(
                name in "[\\p{L}][\\p{L}' -]{0,22}[\\p{L}]"
            ) {
                prop_assert_eq!(
                    validate(&name, FieldKind::FirstName, true),
                    Ok(())
                );
            }
        }
    }
}
