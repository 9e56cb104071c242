//! JWT error types
//!
//! The first four variants are the failures the refresh orchestration
//! branches on; everything else is terminal for the request that hit it.

use chrono::{DateTime, Utc};
use isecl_common::CryptError;
use thiserror::Error;

/// Result type for JWT operations
pub type Result<T> = std::result::Result<T, JwtError>;

/// Errors raised while signing tokens, building trust stores or validating
/// tokens
#[derive(Error, Debug)]
pub enum JwtError {
    /// The token's key id is not in the current trust store
    #[error("certificate with matching public key not found. kid (key id) : {key_id}")]
    MatchingCertNotFound {
        /// Key id presented in the token header
        key_id: String,
    },

    /// The token's key id is known but its certificate has expired
    #[error("certificate with matching public key just expired. kid (key id) : {key_id}")]
    MatchingCertJustExpired {
        /// Key id presented in the token header
        key_id: String,
    },

    /// The whole trust store is past its cache window
    #[error("verifier expired at {expiry}")]
    VerifierExpired {
        /// Instant the trust store stopped being fresh
        expiry: DateTime<Utc>,
    },

    /// No usable signing certificate is available
    #[error("there are no valid certificates when initializing jwt verifier")]
    NoValidCertFound,

    /// The token header has no `kid`
    #[error("no kid (key id) in jwt header - cannot select the signing certificate")]
    MissingKeyId,

    /// The token header `kid` is not a string
    #[error("kid (key id) in jwt header is not a string: {0}")]
    InvalidKeyId(String),

    /// More signing certificates than a trust store may hold
    #[error("too many jwt signing certificates ({count} > {limit}). Possibly an incorrect directory passed in")]
    TooManyCertificates {
        /// Number of valid certificates found
        count: usize,
        /// Maximum allowed
        limit: usize,
    },

    /// Key type or size cannot be used for JWT signing
    #[error("unsupported key for JWT signing: {0}")]
    UnsupportedKey(String),

    /// The signing certificate does not carry the signing key's public half
    #[error("signing certificate public key does not match the signing key")]
    KeyMismatch,

    /// Token signing failed
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The token header names an algorithm the selected key cannot verify
    #[error("algorithm {algorithm} not allowed for key {key_id}")]
    AlgorithmNotAllowed {
        /// Algorithm from the token header
        algorithm: String,
        /// Key id of the selected certificate
        key_id: String,
    },

    /// The token is not a well formed compact JWT
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature or standard claim verification failed
    #[error("token verification failed: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),

    /// Custom claims could not be serialized or decoded
    #[error("claims error: {0}")]
    Claims(String),

    /// Certificate or key parsing failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptError),

    /// Trust material could not be loaded or fetched
    #[error("trust material error: {0}")]
    TrustMaterial(String),

    /// The certificate download guard was already taken
    #[error("already attempted to download JWT signing certificates. Will not attempt again")]
    DownloadAlreadyAttempted,
}

impl JwtError {
    /// Whether rebuilding the trust store (possibly after fetching new trust
    /// material) may make the same token validate
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            JwtError::MatchingCertNotFound { .. }
                | JwtError::MatchingCertJustExpired { .. }
                | JwtError::VerifierExpired { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            JwtError::MatchingCertNotFound { .. } => "matching_cert_not_found",
            JwtError::MatchingCertJustExpired { .. } => "matching_cert_just_expired",
            JwtError::VerifierExpired { .. } => "verifier_expired",
            JwtError::NoValidCertFound => "no_valid_cert_found",
            JwtError::MissingKeyId => "missing_key_id",
            JwtError::InvalidKeyId(_) => "invalid_key_id",
            JwtError::TooManyCertificates { .. } => "too_many_certificates",
            JwtError::UnsupportedKey(_) => "unsupported_key",
            JwtError::KeyMismatch => "key_mismatch",
            JwtError::Signing(_) => "signing",
            JwtError::AlgorithmNotAllowed { .. } => "algorithm_not_allowed",
            JwtError::Malformed(_) => "malformed",
            JwtError::Verification(_) => "verification",
            JwtError::Claims(_) => "claims",
            JwtError::Crypto(_) => "crypto",
            JwtError::TrustMaterial(_) => "trust_material",
            JwtError::DownloadAlreadyAttempted => "download_already_attempted",
        }
    }
}

impl From<openssl::error::ErrorStack> for JwtError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        JwtError::Crypto(CryptError::OpenSsl(error))
    }
}
