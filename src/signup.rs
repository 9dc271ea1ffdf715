//! Signup payload validation.
//!
//! Payloads are checked field by field against the raw JSON so that every
//! problem is reported at once, keyed by field name.

use crate::error::ValidationErrors;
use crate::models::UserDraft;
use crate::password::PasswordHasher;
use serde_json::{Map, Value};

const MISSING: &str = "Missing data for required field.";
const NOT_A_STRING: &str = "Not a valid string.";
const FIELDS: [&str; 3] = ["email", "full_name", "password"];

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;

/// A signup that passed validation; the password is still in clear text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

impl SignupRequest {
    pub fn parse(payload: &Value) -> Result<Self, ValidationErrors> {
        let Some(object) = payload.as_object() else {
            return Err(ValidationErrors::single("_schema", "Invalid input type."));
        };

        let mut errors = ValidationErrors::new();

        for key in object.keys() {
            if !FIELDS.contains(&key.as_str()) {
                errors.add(key, "Unknown field.");
            }
        }

        let email = required_string(object, "email", &mut errors);
        if let Some(email) = email {
            if !is_valid_email(email) {
                errors.add("email", "Not a valid email address.");
            }
        }

        let full_name = required_string(object, "full_name", &mut errors);
        if let Some(full_name) = full_name {
            if let Err(message) = check_full_name(full_name) {
                errors.add("full_name", message);
            }
        }

        let password = required_string(object, "password", &mut errors);
        if let Some(password) = password {
            for message in check_password(password) {
                errors.add("password", message);
            }
        }

        match (email, full_name, password) {
            (Some(email), Some(full_name), Some(password)) if errors.is_empty() => Ok(Self {
                email: email.to_string(),
                full_name: full_name.to_string(),
                password: password.to_string(),
            }),
            _ => Err(errors),
        }
    }

    /// Replace the clear-text password with a salted hash
    pub fn into_draft(self, hasher: &PasswordHasher) -> UserDraft {
        UserDraft {
            password: hasher.hash(&self.password),
            email: self.email,
            full_name: self.full_name,
        }
    }
}

fn required_string<'a>(object: &'a Map<String, Value>, field: &str, errors: &mut ValidationErrors) -> Option<&'a str> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.add(field, MISSING);
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// `local@domain.tld` with no whitespace and a dotted, alphabetic-TLD domain
pub fn is_valid_email(value: &str) -> bool {
    if value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || local.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}

/// Exactly a first and a last name; rejected only when both are short
fn check_full_name(value: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [first, last] = parts.as_slice() else {
        return Err("Full name should consist of first and last name at least.");
    };
    if first.chars().count() < 3 && last.chars().count() < 3 {
        return Err("Name should be at least 3 characters");
    }
    Ok(())
}

/// Length bounds plus the complexity rule: an uppercase letter, a digit,
/// a special character, and a non-letter
pub fn check_password(value: &str) -> Vec<String> {
    let mut messages = Vec::new();

    let len = value.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        messages.push(format!(
            "Length must be between {} and {}.",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        ));
    }

    let uppercase = value.chars().any(char::is_uppercase);
    let digit = value.chars().any(|c| c.is_ascii_digit());
    let special = value.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());
    let non_letter = value.chars().any(|c| !c.is_alphabetic());
    if !(uppercase && digit && special && non_letter) {
        messages.push("Not a valid password.".to_string());
    }

    messages
}
