//! Error types for certificate, key and file helpers

use thiserror::Error;

/// Result type for `isecl-common` operations
pub type Result<T> = std::result::Result<T, CryptError>;

/// Errors raised while parsing, hashing or generating key material
#[derive(Error, Debug)]
pub enum CryptError {
    #[error("Failed to parse PEM: {0}")]
    Pem(String),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Failed to parse X.509 certificate: {0}")]
    X509Parse(String),

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("Invalid certificate validity: {0}")]
    InvalidValidity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory scan failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CryptError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CryptError::Pem(_) => "pem",
            CryptError::OpenSsl(_) => "openssl",
            CryptError::X509Parse(_) => "x509_parse",
            CryptError::UnsupportedKey(_) => "unsupported_key",
            CryptError::InvalidValidity(_) => "invalid_validity",
            CryptError::Io(_) => "io",
            CryptError::Walk(_) => "walk",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CryptError::Pem("no CERTIFICATE block".to_string());
        assert_eq!(error.to_string(), "Failed to parse PEM: no CERTIFICATE block");
        assert_eq!(error.category(), "pem");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: CryptError = io_error.into();
        assert!(matches!(error, CryptError::Io(_)));
        assert_eq!(error.category(), "io");
    }
}
