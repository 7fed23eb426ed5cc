//! errors raised while translating a single resource
use crate::value::ValueType;

pub type TranslationResult<T> = Result<T, TranslationError>;

/// Aborts translation of one resource. Other resources in the same batch are unaffected.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("{address}: missing required field `{field}`")]
    MissingRequiredField { field: String, address: String },
    #[error("field `{field}` must be of type {expected_type}, found `{raw_value}`")]
    InvalidFieldType {
        field: String,
        expected_type: ValueType,
        raw_value: String,
    },
}

impl TranslationError {
    pub fn missing(field: impl Into<String>, address: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            address: address.into(),
        }
    }

    pub fn invalid(
        field: impl Into<String>,
        expected_type: ValueType,
        raw_value: impl Into<String>,
    ) -> Self {
        Self::InvalidFieldType {
            field: field.into(),
            expected_type,
            raw_value: raw_value.into(),
        }
    }

    /// Qualifies the field of an [TranslationError::InvalidFieldType] with the path of the block it was read from
    pub fn within(self, prefix: &str) -> Self {
        match self {
            Self::InvalidFieldType {
                field,
                expected_type,
                raw_value,
            } => Self::InvalidFieldType {
                field: format!("{prefix}.{field}"),
                expected_type,
                raw_value,
            },
            other => other,
        }
    }
}
