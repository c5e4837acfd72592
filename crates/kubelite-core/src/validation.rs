//! Object name and data key validation.
//!
//! The store encodes (namespace, name, key) into a single file name, so every
//! name and key must be checked here before it reaches the store: besides the
//! usual Kubernetes rules, none of them may contain a reserved file-name token.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const DNS1123_LABEL_MAX_LEN: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;
const DATA_KEY_MAX_LEN: usize = 253;

static DNS1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

static DATA_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-._a-zA-Z0-9]+$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{what} must not be empty")]
    Empty { what: &'static str },
    #[error("{what} {value:?} must be no more than {max} characters")]
    TooLong {
        what: &'static str,
        value: String,
        max: usize,
    },
    #[error("{what} {value:?} is invalid: {reason}")]
    Invalid {
        what: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("{what} {value:?} must not contain reserved token {token:?}")]
    Reserved {
        what: &'static str,
        value: String,
        token: String,
    },
}

/// Validate a namespace name (RFC 1123 label).
pub fn validate_namespace_name(name: &str) -> Result<(), ValidationError> {
    check(
        "namespace name",
        name,
        DNS1123_LABEL_MAX_LEN,
        &DNS1123_LABEL,
        "must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character",
    )
}

/// Validate an object name (RFC 1123 subdomain) against the store's reserved tokens.
pub fn validate_object_name(name: &str, reserved: &[&str]) -> Result<(), ValidationError> {
    check(
        "object name",
        name,
        DNS1123_SUBDOMAIN_MAX_LEN,
        &DNS1123_SUBDOMAIN,
        "must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character",
    )?;
    check_reserved("object name", name, reserved)
}

/// Validate a ConfigMap/Secret data key against the store's reserved tokens.
pub fn validate_data_key(key: &str, reserved: &[&str]) -> Result<(), ValidationError> {
    check(
        "data key",
        key,
        DATA_KEY_MAX_LEN,
        &DATA_KEY,
        "must consist of alphanumeric characters, '-', '_' or '.'",
    )?;
    if key == "." || key == ".." {
        return Err(ValidationError::Invalid {
            what: "data key",
            value: key.to_string(),
            reason: "must not be '.' or '..'",
        });
    }
    check_reserved("data key", key, reserved)
}

fn check(
    what: &'static str,
    value: &str,
    max: usize,
    pattern: &Regex,
    reason: &'static str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { what });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            what,
            value: value.to_string(),
            max,
        });
    }
    if !pattern.is_match(value) {
        return Err(ValidationError::Invalid {
            what,
            value: value.to_string(),
            reason,
        });
    }
    Ok(())
}

fn check_reserved(what: &'static str, value: &str, reserved: &[&str]) -> Result<(), ValidationError> {
    match reserved.iter().find(|token| value.contains(**token)) {
        Some(token) => Err(ValidationError::Reserved {
            what,
            value: value.to_string(),
            token: token.to_string(),
        }),
        None => Ok(()),
    }
}
