//! Token factory and verifier configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

use crate::verifier::VerifierOptions;

/// Default lifetime of issued tokens (24 hours)
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Default freshness window of a verifier trust store (1 hour)
pub const DEFAULT_CACHE_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Token factory configuration
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenFactoryConfig {
    /// Value of the `iss` claim
    pub issuer: String,

    /// Default lifetime of issued tokens, in seconds
    #[serde_as(as = "DurationSeconds<u64>")]
    pub token_validity: Duration,

    /// Put the signing certificate's SHA-1 fingerprint in the `kid` header
    pub include_key_id: bool,
}

impl Default for TokenFactoryConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            token_validity: DEFAULT_TOKEN_VALIDITY,
            include_key_id: true,
        }
    }
}

/// Verifier configuration
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    /// Directory of trusted JWT signing certificates
    pub signing_certs_dir: PathBuf,

    /// Directory of trusted root CA certificates
    pub trusted_cas_dir: PathBuf,

    /// Wildcard selecting certificate files in both directories
    pub file_pattern: String,

    /// Freshness window of a trust store, in seconds
    #[serde_as(as = "DurationSeconds<u64>")]
    pub cache_lifetime: Duration,

    /// Required `iss` claim, if any
    pub expected_issuer: Option<String>,

    /// Clock skew tolerated on `exp` and `nbf`, in seconds
    #[serde_as(as = "DurationSeconds<u64>")]
    pub leeway: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            signing_certs_dir: PathBuf::from("certs/trustedjwt"),
            trusted_cas_dir: PathBuf::from("certs/trustedca"),
            file_pattern: default_file_pattern(),
            cache_lifetime: DEFAULT_CACHE_LIFETIME,
            expected_issuer: None,
            leeway: Duration::ZERO,
        }
    }
}

fn default_file_pattern() -> String {
    "*.pem".to_string()
}

impl VerifierConfig {
    /// Trust store options derived from this configuration
    pub fn options(&self) -> VerifierOptions {
        let mut options = VerifierOptions::new(self.cache_lifetime).with_leeway(self.leeway);
        if let Some(issuer) = &self.expected_issuer {
            options = options.with_expected_issuer(issuer.clone());
        }
        options
    }
}
