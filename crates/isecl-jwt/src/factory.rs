//! Token signing
//!
//! A [`TokenFactory`] holds one private key and signs tokens with the
//! algorithm its key kind maps to. When built with the matching signing
//! certificate it stamps every token with the certificate's SHA-1
//! fingerprint as `kid`, which is what verifiers select keys by.

use std::fmt;
use std::time::Duration;

use isecl_common::crypt::{
    HashAlgorithm, KeyKind, cert_from_pem, cert_hash_hex, parse_pkcs8_private_key,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use openssl::pkey::{PKey, Private};
use serde::Serialize;
use tracing::{debug, info};

use crate::algorithm::signing_algorithm;
use crate::claims::{StandardClaims, merge_claims};
use crate::config::{DEFAULT_TOKEN_VALIDITY, TokenFactoryConfig};
use crate::{JwtError, Result};

/// Backdating applied to `iat` so verifiers with a slightly slow clock
/// accept fresh tokens
pub const ISSUED_AT_GRACE: Duration = Duration::from_secs(10);

/// Signs JWTs with a configured key
pub struct TokenFactory {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
    key_id: Option<String>,
    issuer: String,
    token_validity: Duration,
}

impl fmt::Debug for TokenFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenFactory")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("token_validity", &self.token_validity)
            .finish_non_exhaustive()
    }
}

impl TokenFactory {
    /// Create a factory from a PKCS#8 DER private key
    ///
    /// `key_id` is only set when `include_key_id` is true and a signing
    /// certificate PEM is supplied. A missing or zero `token_validity` falls
    /// back to 24 hours.
    ///
    /// # Errors
    ///
    /// - [`JwtError::Crypto`] if the key or certificate cannot be parsed
    /// - [`JwtError::UnsupportedKey`] for keys outside RSA 3072/4096 and
    ///   EC P-256/P-384
    /// - [`JwtError::KeyMismatch`] if the certificate belongs to another key
    pub fn new(
        pkcs8_der: &[u8],
        include_key_id: bool,
        signing_cert_pem: Option<&[u8]>,
        issuer: impl Into<String>,
        token_validity: Option<Duration>,
    ) -> Result<Self> {
        let key = parse_pkcs8_private_key(pkcs8_der)?;
        let kind = KeyKind::of(&key)?;
        let algorithm = signing_algorithm(kind)?;
        let encoding_key = encoding_key(&key, kind)?;

        let key_id = match signing_cert_pem {
            Some(pem) if include_key_id && !pem.is_empty() => {
                let cert = cert_from_pem(pem)?;
                if !cert.public_key()?.public_eq(&key) {
                    return Err(JwtError::KeyMismatch);
                }
                Some(cert_hash_hex(&cert, HashAlgorithm::Sha1)?)
            }
            _ => None,
        };

        let factory = Self {
            encoding_key,
            algorithm,
            key_id,
            issuer: issuer.into(),
            token_validity: token_validity
                .filter(|validity| !validity.is_zero())
                .unwrap_or(DEFAULT_TOKEN_VALIDITY),
        };
        info!(
            algorithm = ?factory.algorithm,
            key_id = factory.key_id.as_deref().unwrap_or("-"),
            issuer = %factory.issuer,
            "JWT token factory initialized"
        );
        Ok(factory)
    }

    /// Create a factory from configuration plus key material
    ///
    /// # Errors
    ///
    /// Same as [`TokenFactory::new`].
    pub fn from_config(
        config: &TokenFactoryConfig,
        pkcs8_der: &[u8],
        signing_cert_pem: Option<&[u8]>,
    ) -> Result<Self> {
        Self::new(
            pkcs8_der,
            config.include_key_id,
            signing_cert_pem,
            config.issuer.clone(),
            Some(config.token_validity),
        )
    }

    /// Sign a token carrying `claims` for `subject`
    ///
    /// The custom claims are flattened into the body next to `iss`, `sub`,
    /// `iat` and `exp`. `validity` overrides the factory default for this
    /// token; `None` or zero keeps the default.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::Claims`] if `claims` does not serialize to a JSON
    /// object and [`JwtError::Signing`] if signing fails.
    pub fn create<C: Serialize + ?Sized>(
        &self,
        claims: &C,
        subject: &str,
        validity: Option<Duration>,
    ) -> Result<String> {
        let validity = validity
            .filter(|validity| !validity.is_zero())
            .unwrap_or(self.token_validity);
        let now = jsonwebtoken::get_current_timestamp();

        let standard = StandardClaims {
            iss: Some(self.issuer.clone()).filter(|iss| !iss.is_empty()),
            sub: Some(subject.to_string()).filter(|sub| !sub.is_empty()),
            exp: Some(now.saturating_add(validity.as_secs())),
            iat: Some(now.saturating_sub(ISSUED_AT_GRACE.as_secs())),
            ..Default::default()
        };
        let body = merge_claims(claims, &standard)?;

        let mut header = Header::new(self.algorithm);
        header.kid = self.key_id.clone();

        let token = jsonwebtoken::encode(&header, &body, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))?;
        debug!(subject, validity_secs = validity.as_secs(), "Issued JWT");
        Ok(token)
    }

    /// Algorithm tokens are signed with
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// `kid` stamped on issued tokens
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// `iss` stamped on issued tokens
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Default token lifetime
    pub fn token_validity(&self) -> Duration {
        self.token_validity
    }
}

fn encoding_key(key: &PKey<Private>, kind: KeyKind) -> Result<EncodingKey> {
    let key = match kind {
        KeyKind::Rsa { .. } => EncodingKey::from_rsa_pem(&key.rsa()?.private_key_to_pem()?),
        KeyKind::Ec(_) => EncodingKey::from_ec_pem(&key.private_key_to_pem_pkcs8()?),
    };
    key.map_err(|e| JwtError::UnsupportedKey(e.to_string()))
}
