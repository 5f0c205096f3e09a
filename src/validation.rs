// Validation utilities module
// Provides custom validation functions for account fields

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use validator::{ValidationError, ValidationErrors};

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("static username regex"))
}

/// Validates that a username is 3-30 characters of letters, digits or underscores
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username_regex().is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_username");
        err.message = Some(Cow::from(
            "Username must be 3-30 characters of letters, digits or underscores",
        ));
        Err(err)
    }
}

/// Validates that a required field is present and not just whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::from("This field is required"));
        Err(err)
    } else {
        Ok(())
    }
}

/// Flattens validator errors into one client-safe sentence, sorted by field
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    parts.sort();

    if parts.is_empty() {
        "Request validation failed".to_string()
    } else {
        parts.join("; ")
    }
}
