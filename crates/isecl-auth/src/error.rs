//! Request authentication errors

use http::StatusCode;
use isecl_jwt::JwtError;
use thiserror::Error;

/// Result type for request authentication
pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a request could not be authenticated
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization: Bearer` header
    #[error("no bearer token provided for authorization")]
    MissingBearerToken,

    /// The token was rejected
    #[error("token validation failure: {0}")]
    Unauthorized(#[source] JwtError),

    /// The service cannot validate tokens at all
    #[error("token verifier unavailable: {0}")]
    Internal(#[source] JwtError),
}

impl AuthError {
    /// HTTP status to answer the request with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingBearerToken | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AuthError::MissingBearerToken => "missing_bearer_token",
            AuthError::Unauthorized(e) | AuthError::Internal(e) => e.category(),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(error: JwtError) -> Self {
        match error {
            JwtError::NoValidCertFound
            | JwtError::TooManyCertificates { .. }
            | JwtError::TrustMaterial(_)
            | JwtError::Crypto(_) => AuthError::Internal(error),
            _ => AuthError::Unauthorized(error),
        }
    }
}
