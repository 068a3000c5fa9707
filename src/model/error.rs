//! Record validation errors
//!
//! Raised when a reservation crossing the API or push boundary does not
//! match the expected shape.

use thiserror::Error;

/// Errors produced while validating a reservation record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A required field is absent, null or blank
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The identifier is neither a string nor an integer
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The date is not a calendar day
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The party size is not a whole number >= 1
    #[error("invalid party size `{0}`, expected a whole number of at least 1")]
    InvalidPartySize(String),

    /// The record is not a JSON object of the expected shape
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecordError::MissingField("nombre");
        assert_eq!(err.to_string(), "missing required field `nombre`");

        let err = RecordError::InvalidPartySize("0".to_string());
        assert_eq!(
            err.to_string(),
            "invalid party size `0`, expected a whole number of at least 1"
        );
    }
}
