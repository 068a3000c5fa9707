//! Reservation API errors

use thiserror::Error;

use crate::model::RecordError;

/// Errors that can occur when talking to the reservation service
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Reservation service unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid reservation at position {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: RecordError,
    },
}

impl ApiError {
    /// Classify a transport error the way the rest of the client reports it
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Unavailable
        } else {
            ApiError::Request(err)
        }
    }

    /// Whether the error came from the network rather than the service
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Unavailable | ApiError::Timeout | ApiError::Request(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error 404: not found");

        let err = ApiError::InvalidRecord {
            index: 3,
            source: RecordError::MissingField("email"),
        };
        assert_eq!(
            err.to_string(),
            "Invalid reservation at position 3: missing required field `email`"
        );
    }

    #[test]
    fn test_transport_classification() {
        assert!(ApiError::Timeout.is_transport());
        assert!(ApiError::Unavailable.is_transport());
        assert!(!ApiError::Decode("x".to_string()).is_transport());
    }
}
