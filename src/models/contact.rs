//! Contact payload and field validation.
//!
//! The booking widget collects contact details at confirmation time. All
//! fields are validated here, before any store round-trip, and rejections
//! carry field-level detail.
//!
//! # Rules
//!
//! - Full name: at least two words; letters, spaces, hyphens, apostrophes
//! - Email: syntactically valid, normalized to lower-case
//! - Phone: Spanish national format — optional +34/0034 prefix, 9 digits
//!   starting with 6, 7, 8, or 9; spaces, dots, and dashes tolerated
//! - Clinic name: optional, capped at 200 characters
//! - Message: optional free text, capped at 2000 characters

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Unicode letters so accented names (García, Muñoz) pass.
    Regex::new(r"^[\p{L}' -]+$").expect("valid name regex")
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\+34|0034)?[6789]\d{8}$").expect("valid phone regex"));

const MAX_CLINIC_NAME_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 2000;

/// Contact details as received from the client, unvalidated.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub clinic_name: Option<String>,
    pub message: Option<String>,
}

/// Validated, normalized contact details ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub full_name: String,
    /// Normalized to lower-case
    pub email: String,
    /// Separators stripped, prefix preserved as supplied
    pub phone: String,
    pub clinic_name: Option<String>,
    pub message: Option<String>,
}

impl TryFrom<ContactRequest> for Contact {
    type Error = AppError;

    fn try_from(request: ContactRequest) -> Result<Self, Self::Error> {
        let full_name = validate_full_name(&request.full_name)?;
        let email = validate_email(&request.email)?;
        let phone = validate_phone(&request.phone)?;

        let clinic_name = match request.clinic_name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.len() > MAX_CLINIC_NAME_LEN {
                    return Err(AppError::Validation(
                        "clinic_name: must be at most 200 characters".to_string(),
                    ));
                }
                (!name.is_empty()).then_some(name)
            }
            None => None,
        };

        let message = match request.message {
            Some(text) => {
                let text = text.trim().to_string();
                if text.len() > MAX_MESSAGE_LEN {
                    return Err(AppError::Validation(
                        "message: must be at most 2000 characters".to_string(),
                    ));
                }
                (!text.is_empty()).then_some(text)
            }
            None => None,
        };

        Ok(Contact {
            full_name,
            email,
            phone,
            clinic_name,
            message,
        })
    }
}

fn validate_full_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.split_whitespace().count() < 2 {
        return Err(AppError::Validation(
            "full_name: first and last name are required".to_string(),
        ));
    }
    if !NAME_RE.is_match(name) {
        return Err(AppError::Validation(
            "full_name: only letters, spaces, hyphens, and apostrophes are allowed".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::Validation(
            "email: must be a valid email address".to_string(),
        ));
    }
    Ok(email)
}

fn validate_phone(raw: &str) -> Result<String, AppError> {
    // Strip common separators before matching the national format.
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect();
    if !PHONE_RE.is_match(&digits) {
        return Err(AppError::Validation(
            "phone: must be a valid Spanish phone number".to_string(),
        ));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(full_name: &str, email: &str, phone: &str) -> ContactRequest {
        ContactRequest {
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            clinic_name: None,
            message: None,
        }
    }

    #[test]
    fn accepts_valid_contact_and_normalizes() {
        let contact =
            Contact::try_from(request("Laura Gómez", "Laura@ClinicaSur.ES", "+34 612 345 678"))
                .unwrap();
        assert_eq!(contact.full_name, "Laura Gómez");
        assert_eq!(contact.email, "laura@clinicasur.es");
        assert_eq!(contact.phone, "+34612345678");
    }

    #[test]
    fn accepts_hyphens_and_apostrophes_in_names() {
        assert!(Contact::try_from(request("Anne-Marie O'Neill", "a@b.es", "612345678")).is_ok());
    }

    #[test]
    fn rejects_single_word_name() {
        let err = Contact::try_from(request("Laura", "laura@example.es", "612345678")).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.starts_with("full_name")));
    }

    #[test]
    fn rejects_name_with_digits() {
        let err = Contact::try_from(request("Laura 2", "laura@example.es", "612345678"))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.starts_with("full_name")));
    }

    #[test]
    fn rejects_malformed_email() {
        for email in ["not-an-email", "a@b", "a b@c.es", "@example.es"] {
            let err = Contact::try_from(request("Laura Gómez", email, "612345678")).unwrap_err();
            assert!(
                matches!(err, AppError::Validation(ref msg) if msg.starts_with("email")),
                "expected rejection for {email}"
            );
        }
    }

    #[test]
    fn rejects_non_spanish_phone() {
        for phone in ["12345", "512345678", "+1 555 0100", "61234567"] {
            let err = Contact::try_from(request("Laura Gómez", "laura@example.es", phone))
                .unwrap_err();
            assert!(
                matches!(err, AppError::Validation(ref msg) if msg.starts_with("phone")),
                "expected rejection for {phone}"
            );
        }
    }

    #[test]
    fn phone_accepts_0034_prefix_and_separators() {
        let contact =
            Contact::try_from(request("Laura Gómez", "laura@example.es", "0034 712-345-678"))
                .unwrap();
        assert_eq!(contact.phone, "0034712345678");
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let mut req = request("Laura Gómez", "laura@example.es", "612345678");
        req.clinic_name = Some("   ".to_string());
        req.message = Some(String::new());
        let contact = Contact::try_from(req).unwrap();
        assert_eq!(contact.clinic_name, None);
        assert_eq!(contact.message, None);
    }

    #[test]
    fn oversized_message_rejected() {
        let mut req = request("Laura Gómez", "laura@example.es", "612345678");
        req.message = Some("x".repeat(2001));
        let err = Contact::try_from(req).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.starts_with("message")));
    }
}
