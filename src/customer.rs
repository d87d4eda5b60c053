//! Customer details and their field-level validation.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest email address accepted.
pub const MAX_EMAIL_LEN: usize = 254;

/// Fewest digits a phone number must contain.
pub const MIN_PHONE_DIGITS: usize = 10;

static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    )
    .ok()
});

static UK_POSTCODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$").ok());

/// Contact and address details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Full name
    pub full_name: String,

    /// Email address as typed
    pub email: String,

    /// Phone number as typed
    pub phone: String,

    /// Postcode as typed
    pub postcode: String,

    /// First address line (optional when a city is given)
    pub address_line1: String,

    /// Second address line
    pub address_line2: String,

    /// Town or city
    pub city: String,
}

/// A customer field that can carry an inline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Full name
    FullName,
    /// Email
    Email,
    /// Phone
    Phone,
    /// Postcode
    Postcode,
    /// Address line 1 or city
    Address,
}

/// Why a single field is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Nothing was entered.
    #[error("{0} is required")]
    Required(Field),

    /// The email is longer than allowed.
    #[error("Email is too long")]
    EmailTooLong,

    /// The email is not a valid address.
    #[error("Invalid email format")]
    InvalidEmail,

    /// The phone number contains characters other than digits and separators.
    #[error("Invalid phone number format")]
    InvalidPhoneCharacters,

    /// The phone number has too few digits.
    #[error("Phone number must have at least {MIN_PHONE_DIGITS} digits")]
    PhoneTooShort,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::FullName => "Full name",
            Field::Email => "Email",
            Field::Phone => "Phone number",
            Field::Postcode => "Postcode",
            Field::Address => "Address or city",
        })
    }
}

impl CustomerDetails {
    /// The email trimmed and lower-cased, if it is valid.
    pub fn normalized_email(&self) -> Option<String> {
        validate_email(&self.email).ok()
    }

    /// Whether the email passes validation.
    pub fn has_valid_email(&self) -> bool {
        validate_email(&self.email).is_ok()
    }

    /// Whether the phone number passes validation.
    pub fn has_valid_phone(&self) -> bool {
        validate_phone(&self.phone).is_ok()
    }

    /// Address line 1 or city is present.
    pub fn has_address(&self) -> bool {
        !self.address_line1.trim().is_empty() || !self.city.trim().is_empty()
    }

    /// Inline errors for every invalid field, in form order.
    pub fn field_errors(&self) -> Vec<(Field, FieldError)> {
        let mut errors = Vec::new();

        if self.full_name.trim().is_empty() {
            errors.push((Field::FullName, FieldError::Required(Field::FullName)));
        }

        if let Err(err) = validate_email(&self.email) {
            errors.push((Field::Email, err));
        }

        if let Err(err) = validate_phone(&self.phone) {
            errors.push((Field::Phone, err));
        }

        if self.postcode.trim().is_empty() {
            errors.push((Field::Postcode, FieldError::Required(Field::Postcode)));
        }

        if !self.has_address() {
            errors.push((Field::Address, FieldError::Required(Field::Address)));
        }

        errors
    }

    /// A single-line postal address.
    pub fn address(&self) -> String {
        [
            self.address_line1.trim(),
            self.address_line2.trim(),
            self.city.trim(),
            self.postcode.trim(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Validate an email and return it trimmed and lower-cased.
///
/// # Errors
///
/// Returns a [`FieldError`] describing the first rule the email breaks.
pub fn validate_email(email: &str) -> Result<String, FieldError> {
    let sanitized = email.trim().to_lowercase();

    if sanitized.is_empty() {
        return Err(FieldError::Required(Field::Email));
    }

    if sanitized.len() > MAX_EMAIL_LEN {
        return Err(FieldError::EmailTooLong);
    }

    let matches = EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(&sanitized));

    if !matches
        || sanitized.contains("..")
        || sanitized.starts_with('.')
        || sanitized.ends_with('.')
    {
        return Err(FieldError::InvalidEmail);
    }

    Ok(sanitized)
}

/// Validate a phone number: digits plus ` +-().` separators, at least ten digits.
///
/// # Errors
///
/// Returns a [`FieldError`] describing why the number is rejected.
pub fn validate_phone(phone: &str) -> Result<(), FieldError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(FieldError::Required(Field::Phone));
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'))
    {
        return Err(FieldError::InvalidPhoneCharacters);
    }

    if phone.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
        return Err(FieldError::PhoneTooShort);
    }

    Ok(())
}

/// Upper-case a postcode and collapse internal whitespace to single spaces.
pub fn normalize_postcode(postcode: &str) -> String {
    postcode
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Whether a postcode has the shape of a UK postcode.
pub fn is_uk_postcode(postcode: &str) -> bool {
    let normalized = normalize_postcode(postcode);

    UK_POSTCODE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(&normalized))
}

/// Mask an email for logging, keeping the first character and the domain.
pub fn mask_email(email: &str) -> String {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map_or_else(String::new, String::from);

            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn complete() -> CustomerDetails {
        CustomerDetails {
            full_name: "Jane Smith".to_string(),
            email: "jane@example.com".to_string(),
            phone: "07700 900123".to_string(),
            postcode: "SW1A 1AA".to_string(),
            address_line1: String::new(),
            address_line2: String::new(),
            city: "London".to_string(),
        }
    }

    #[test]
    fn patterns_compile() {
        assert!(EMAIL_PATTERN.is_some(), "email pattern failed to compile");
        assert!(UK_POSTCODE_PATTERN.is_some(), "postcode pattern failed to compile");
    }

    #[test]
    fn email_is_trimmed_and_lowercased() -> TestResult {
        assert_eq!(validate_email("  Jane@Example.COM ")?, "jane@example.com");

        Ok(())
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        for email in ["jane", "jane@", "@example.com", "jane@example", "jane..doe@example.com", ".jane@example.com"] {
            assert_eq!(validate_email(email), Err(FieldError::InvalidEmail), "{email}");
        }
    }

    #[test]
    fn email_rejects_overlong_addresses() {
        let email = format!("{}@example.com", "a".repeat(250));

        assert_eq!(validate_email(&email), Err(FieldError::EmailTooLong));
    }

    #[test]
    fn empty_email_is_required() {
        assert_eq!(validate_email("   "), Err(FieldError::Required(Field::Email)));
    }

    #[test]
    fn phone_accepts_separators() {
        assert!(validate_phone("+44 (0) 7700-900.123").is_ok());
    }

    #[test]
    fn phone_rejects_letters_and_short_numbers() {
        assert_eq!(validate_phone("0770 CALL ME"), Err(FieldError::InvalidPhoneCharacters));
        assert_eq!(validate_phone("0770 900"), Err(FieldError::PhoneTooShort));
    }

    #[test]
    fn postcode_is_normalized() {
        assert_eq!(normalize_postcode("  sw1a   1aa "), "SW1A 1AA");
        assert!(is_uk_postcode("sw1a1aa"));
        assert!(!is_uk_postcode("12345"));
    }

    #[test]
    fn city_alone_satisfies_address() {
        assert!(complete().has_address());
        assert!(complete().field_errors().is_empty());
    }

    #[test]
    fn missing_address_and_city_is_reported() {
        let details = CustomerDetails {
            city: String::new(),
            ..complete()
        };

        assert_eq!(
            details.field_errors(),
            vec![(Field::Address, FieldError::Required(Field::Address))]
        );
    }

    #[test]
    fn address_joins_present_parts() {
        let details = CustomerDetails {
            address_line1: "10 Downing St".to_string(),
            ..complete()
        };

        assert_eq!(details.address(), "10 Downing St, London, SW1A 1AA");
    }

    #[test]
    fn mask_email_hides_local_part() {
        assert_eq!(mask_email("jane@example.com"), "j***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
