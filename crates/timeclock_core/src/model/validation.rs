//! Model validation errors shared by all builders.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised before an entity may be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// A mandatory text field is empty or whitespace only.
    BlankField(&'static str),
    /// A numeric field that must not be negative is negative.
    NegativeValue { field: &'static str, value: i64 },
    /// Currency code is not three ASCII uppercase letters.
    InvalidCurrency(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::NegativeValue { field, value } => {
                write!(f, "`{field}` must not be negative, got {value}")
            }
            Self::InvalidCurrency(code) => {
                write!(f, "currency must be a three letter uppercase code, got `{code}`")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_non_negative(
    field: &'static str,
    value: i64,
) -> Result<(), ModelValidationError> {
    if value < 0 {
        return Err(ModelValidationError::NegativeValue { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_non_negative, require_text, ModelValidationError};

    #[test]
    fn require_text_rejects_whitespace() {
        assert_eq!(
            require_text("status", "  \t").unwrap_err(),
            ModelValidationError::BlankField("status")
        );
        assert!(require_text("status", "open").is_ok());
    }

    #[test]
    fn require_non_negative_reports_value() {
        let err = require_non_negative("hourly_rate", -5).unwrap_err();
        assert_eq!(err.to_string(), "`hourly_rate` must not be negative, got -5");
    }
}
