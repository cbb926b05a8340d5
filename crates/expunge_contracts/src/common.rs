#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonCodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
        got: f64,
    },
    MissingField {
        field: &'static str,
        reason: &'static str,
    },
    DuplicateCaseId {
        case_id: String,
    },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

/// Shared text rules for contract fields.
///
/// Tokens (identifiers, list entries used as keys) must be ASCII without
/// whitespace; labels (agency names, court names, charge descriptions) allow
/// interior spaces but never control characters.
pub fn validate_token_ascii(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    if !value.is_ascii() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be ASCII",
        });
    }
    if value
        .chars()
        .any(|c| c.is_control() || c.is_ascii_whitespace())
    {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not contain control or whitespace characters",
        });
    }
    Ok(())
}

pub fn validate_label(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not contain control characters",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_contract_01_token_rejects_whitespace() {
        assert!(validate_token_ascii("f", "CF 2020 12", 96).is_err());
        assert!(validate_token_ascii("f", "CF-2020-12", 96).is_ok());
    }

    #[test]
    fn common_contract_02_label_allows_interior_spaces() {
        assert!(validate_label("f", "Tulsa County District Court", 120).is_ok());
        assert!(validate_label("f", "  ", 120).is_err());
        assert!(validate_label("f", "bad\u{0007}bell", 120).is_err());
    }
}
