use thiserror::Error;

/// Main error type for shoal operations
///
/// Every variant maps to the HTTP status code a front-end would return,
/// exposed through [`ShoalError::code`].
#[derive(Error, Debug)]
pub enum ShoalError {
    /// Malformed input: bad JSON, schema violations, unknown fields (400)
    #[error("{0}")]
    BadRequest(String),

    /// A document id that is not present in the collection (404)
    #[error("{0}")]
    NotFound(String),

    /// Requests that are well-formed but outside serviceable bounds (422)
    #[error("{0}")]
    Unprocessable(String),

    /// A stored document failed to parse back (500)
    #[error("{0}")]
    Corruption(String),

    /// The underlying key-value store reported a failure (500)
    #[error("store error: {0}")]
    Store(String),
}

/// Result type alias for shoal operations
pub type Result<T> = std::result::Result<T, ShoalError>;

impl ShoalError {
    /// HTTP status code for this error
    pub fn code(&self) -> u16 {
        match self {
            ShoalError::BadRequest(_) => 400,
            ShoalError::NotFound(_) => 404,
            ShoalError::Unprocessable(_) => 422,
            ShoalError::Corruption(_) | ShoalError::Store(_) => 500,
        }
    }

    /// Check whether this error was caused by caller input rather than state
    pub fn is_client_error(&self) -> bool {
        self.code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ShoalError::BadRequest("bad".into()).code(), 400);
        assert_eq!(ShoalError::NotFound("missing".into()).code(), 404);
        assert_eq!(ShoalError::Unprocessable("too far".into()).code(), 422);
        assert_eq!(ShoalError::Corruption("broken".into()).code(), 500);
        assert_eq!(ShoalError::Store("io".into()).code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = ShoalError::NotFound("Could not find a document with id: 42".to_string());
        assert_eq!(err.to_string(), "Could not find a document with id: 42");
    }

    #[test]
    fn test_client_errors() {
        assert!(ShoalError::BadRequest("x".into()).is_client_error());
        assert!(!ShoalError::Store("x".into()).is_client_error());
    }
}
