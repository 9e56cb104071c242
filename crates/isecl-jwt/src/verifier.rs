//! Trust store snapshots and token validation
//!
//! A [`VerifierSnapshot`] is an immutable map from key id to verification
//! key, built from a set of signing certificate PEMs and a set of trusted
//! root CA PEMs. Certificates are admitted only when they are unexpired,
//! carry a key a JWS algorithm exists for, and are either self-signed CAs or
//! chain to one of the roots. The snapshot stops being fresh at the earlier
//! of its cache window and the first admitted certificate expiry.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use isecl_common::crypt::{
    HashAlgorithm, KeyKind, RootPool, cert_and_chain_from_pem, cert_hash_hex, is_self_signed_ca,
    not_after, public_key_from_cert,
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::algorithm::verification_algorithms;
use crate::claims::StandardClaims;
use crate::config::DEFAULT_CACHE_LIFETIME;
use crate::token::Token;
use crate::{JwtError, Result};

/// Maximum number of signing certificates a snapshot accepts
pub const MAX_SIGNING_CERTIFICATES: usize = 50;

/// Options applied when building a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Freshness window of the snapshot
    pub cache_lifetime: Duration,
    /// Required `iss` claim, if any
    pub expected_issuer: Option<String>,
    /// Clock skew tolerated on `exp` and `nbf`
    pub leeway: Duration,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_LIFETIME)
    }
}

impl VerifierOptions {
    /// Options with the given cache window, no issuer check and no leeway
    pub fn new(cache_lifetime: Duration) -> Self {
        Self {
            cache_lifetime,
            expected_issuer: None,
            leeway: Duration::ZERO,
        }
    }

    /// Require tokens to carry this issuer
    #[must_use]
    pub fn with_expected_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    /// Tolerate this much clock skew on `exp` and `nbf`
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Verification key derived from one trusted signing certificate
#[derive(Clone)]
pub struct TrustedKey {
    key_id: String,
    decoding_key: DecodingKey,
    kind: KeyKind,
    expires_at: DateTime<Utc>,
}

impl fmt::Debug for TrustedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedKey")
            .field("key_id", &self.key_id)
            .field("kind", &self.kind)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl TrustedKey {
    /// Hex SHA-1 fingerprint of the certificate
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Type and size of the certificate key
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Certificate `notAfter`
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Immutable set of verification keys with a freshness deadline
#[derive(Debug, Clone)]
pub struct VerifierSnapshot {
    keys: HashMap<String, TrustedKey>,
    expiration: DateTime<Utc>,
    built_at: DateTime<Utc>,
    expected_issuer: Option<String>,
    leeway: u64,
}

impl VerifierSnapshot {
    /// Build a snapshot with the given cache window and default options
    ///
    /// # Errors
    ///
    /// See [`VerifierSnapshot::build_at`].
    pub fn build<S, SP, R, RP>(
        signing_cert_pems: S,
        root_ca_pems: R,
        cache_lifetime: Duration,
    ) -> Result<Self>
    where
        S: IntoIterator<Item = SP>,
        SP: AsRef<[u8]>,
        R: IntoIterator<Item = RP>,
        RP: AsRef<[u8]>,
    {
        Self::build_at(
            signing_cert_pems,
            root_ca_pems,
            &VerifierOptions::new(cache_lifetime),
            Utc::now(),
        )
    }

    /// Build a snapshot with explicit options
    ///
    /// # Errors
    ///
    /// See [`VerifierSnapshot::build_at`].
    pub fn build_with_options<S, SP, R, RP>(
        signing_cert_pems: S,
        root_ca_pems: R,
        options: &VerifierOptions,
    ) -> Result<Self>
    where
        S: IntoIterator<Item = SP>,
        SP: AsRef<[u8]>,
        R: IntoIterator<Item = RP>,
        RP: AsRef<[u8]>,
    {
        Self::build_at(signing_cert_pems, root_ca_pems, options, Utc::now())
    }

    /// Build a snapshot as of `now`
    ///
    /// Certificates that fail to parse, have expired, are untrusted or carry
    /// an unusable key are skipped with a log line. Zero admitted
    /// certificates is not an error; the snapshot is simply empty.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::TooManyCertificates`] if more than
    /// [`MAX_SIGNING_CERTIFICATES`] certificates are admitted.
    pub fn build_at<S, SP, R, RP>(
        signing_cert_pems: S,
        root_ca_pems: R,
        options: &VerifierOptions,
        now: DateTime<Utc>,
    ) -> Result<Self>
    where
        S: IntoIterator<Item = SP>,
        SP: AsRef<[u8]>,
        R: IntoIterator<Item = RP>,
        RP: AsRef<[u8]>,
    {
        let roots = RootPool::from_pems(root_ca_pems)?;

        let mut expiration = TimeDelta::from_std(options.cache_lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut keys = HashMap::new();
        let mut admitted = 0usize;
        for (index, pem) in signing_cert_pems.into_iter().enumerate() {
            let key = match trusted_key_from_pem(pem.as_ref(), &roots, now) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(e) => {
                    warn!(index, error = %e, "Skipping unusable JWT signing certificate");
                    continue;
                }
            };
            admitted += 1;
            if key.expires_at < expiration {
                expiration = key.expires_at;
            }
            keys.insert(key.key_id.clone(), key);
        }

        if admitted > MAX_SIGNING_CERTIFICATES {
            return Err(JwtError::TooManyCertificates {
                count: admitted,
                limit: MAX_SIGNING_CERTIFICATES,
            });
        }

        info!(
            keys = keys.len(),
            roots = roots.len(),
            expires_at = %expiration,
            "Built JWT verifier"
        );
        Ok(Self {
            keys,
            expiration,
            built_at: now,
            expected_issuer: options.expected_issuer.clone(),
            leeway: options.leeway.as_secs(),
        })
    }

    /// Number of trusted keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no certificate was admitted
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether `key_id` is trusted
    pub fn contains_key_id(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    /// Trusted key for `key_id`
    pub fn trusted_key(&self, key_id: &str) -> Option<&TrustedKey> {
        self.keys.get(key_id)
    }

    /// All trusted keys, in no particular order
    pub fn trusted_keys(&self) -> impl Iterator<Item = &TrustedKey> {
        self.keys.values()
    }

    /// Instant the snapshot stops being fresh
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Instant the snapshot was built
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Whether the snapshot is past its freshness deadline
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiration
    }

    /// Validate a compact JWT and decode its claims into `C`
    ///
    /// # Errors
    ///
    /// See [`VerifierSnapshot::validate_at`].
    pub fn validate<C: DeserializeOwned>(&self, token: &str) -> Result<Token<C>> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a compact JWT, judging certificate and snapshot freshness as
    /// of `now`
    ///
    /// Checks run in this order: key selection by `kid`, certificate expiry,
    /// snapshot expiry, algorithm, then signature and standard claims.
    /// `exp` and `nbf` are checked against the system clock.
    ///
    /// # Errors
    ///
    /// - [`JwtError::MatchingCertNotFound`] if `kid` is not trusted
    /// - [`JwtError::MatchingCertJustExpired`] if its certificate expired
    /// - [`JwtError::VerifierExpired`] if the snapshot is stale
    /// - [`JwtError::MissingKeyId`], or [`JwtError::NoValidCertFound`] for
    ///   an empty snapshot, if the header has no `kid`
    /// - [`JwtError::Verification`] for bad signatures or claims
    pub fn validate_at<C: DeserializeOwned>(&self, token: &str, now: DateTime<Utc>) -> Result<Token<C>> {
        let (header_segment, payload_segment) = split_token(token)?;

        let header: Map<String, Value> = decode_segment(header_segment, "header")?;
        let key = match header.get("kid") {
            Some(Value::String(key_id)) => {
                self.keys
                    .get(key_id)
                    .ok_or_else(|| JwtError::MatchingCertNotFound {
                        key_id: key_id.clone(),
                    })?
            }
            Some(other) => return Err(JwtError::InvalidKeyId(other.to_string())),
            None if self.keys.is_empty() => return Err(JwtError::NoValidCertFound),
            None => return Err(JwtError::MissingKeyId),
        };

        if key.is_expired_at(now) {
            return Err(JwtError::MatchingCertJustExpired {
                key_id: key.key_id.clone(),
            });
        }
        if now > self.expiration {
            return Err(JwtError::VerifierExpired {
                expiry: self.expiration,
            });
        }

        let jose = jsonwebtoken::decode_header(token).map_err(|e| JwtError::Malformed(e.to_string()))?;
        if !verification_algorithms(key.kind).contains(&jose.alg) {
            return Err(JwtError::AlgorithmNotAllowed {
                algorithm: format!("{:?}", jose.alg),
                key_id: key.key_id.clone(),
            });
        }

        let mut validation = Validation::new(jose.alg);
        validation.leeway = self.leeway;
        validation.validate_aud = false;
        validation.validate_nbf = true;
        if let Some(issuer) = &self.expected_issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = jsonwebtoken::decode::<StandardClaims>(token, &key.decoding_key, &validation)?;

        let all_claims: Map<String, Value> = decode_segment(payload_segment, "claims")?;
        let claims = serde_json::from_value::<C>(Value::Object(all_claims.clone()))
            .map_err(|e| JwtError::Claims(e.to_string()))?;

        debug!(key_id = %key.key_id, subject = data.claims.sub.as_deref().unwrap_or("-"), "JWT validated");
        Ok(Token {
            header: data.header,
            standard_claims: data.claims,
            all_claims,
            claims,
        })
    }
}

fn trusted_key_from_pem(pem: &[u8], roots: &RootPool, now: DateTime<Utc>) -> Result<Option<TrustedKey>> {
    let (cert, intermediates) = cert_and_chain_from_pem(pem)?;

    let expires_at = not_after(&cert)?;
    if expires_at <= now {
        debug!(expired_at = %expires_at, "Skipping expired JWT signing certificate");
        return Ok(None);
    }

    if !is_self_signed_ca(&cert)? && !roots.verify(&cert, &intermediates)? {
        warn!("Skipping JWT signing certificate that does not chain to a trusted root");
        return Ok(None);
    }

    let key_id = cert_hash_hex(&cert, HashAlgorithm::Sha1)?;
    let public_key = public_key_from_cert(&cert)?;
    let kind = KeyKind::of(&public_key)?;
    if verification_algorithms(kind).is_empty() {
        warn!(key_id = %key_id, ?kind, "Skipping JWT signing certificate with unsupported key");
        return Ok(None);
    }

    let public_pem = public_key.public_key_to_pem()?;
    let decoding_key = match kind {
        KeyKind::Rsa { .. } => DecodingKey::from_rsa_pem(&public_pem),
        KeyKind::Ec(_) => DecodingKey::from_ec_pem(&public_pem),
    }
    .map_err(|e| JwtError::UnsupportedKey(e.to_string()))?;

    Ok(Some(TrustedKey {
        key_id,
        decoding_key,
        kind,
        expires_at,
    }))
}

fn split_token(token: &str) -> Result<(&str, &str)> {
    let mut segments = token.split('.');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), Some(_), None) => Ok((header, payload)),
        _ => Err(JwtError::Malformed(
            "expected three dot separated segments".to_string(),
        )),
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| JwtError::Malformed(format!("{what}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| JwtError::Malformed(format!("{what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn empty_snapshot() -> VerifierSnapshot {
        VerifierSnapshot::build(Vec::<Vec<u8>>::new(), Vec::<Vec<u8>>::new(), DEFAULT_CACHE_LIFETIME).unwrap()
    }

    #[test]
    fn test_split_token() {
        assert!(split_token("a.b.c").is_ok());
        assert!(matches!(split_token("a.b"), Err(JwtError::Malformed(_))));
        assert!(matches!(split_token("a.b.c.d"), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = empty_snapshot();
        assert!(snapshot.is_empty());
        assert!(!snapshot.is_expired());
        assert!(snapshot.expiration() > snapshot.built_at());
    }

    #[test]
    fn test_empty_snapshot_key_selection_errors() {
        let snapshot = empty_snapshot();
        let payload = segment(&serde_json::json!({"sub": "x"}));

        let with_kid = format!("{}.{payload}.sig", segment(&serde_json::json!({"alg": "ES256", "kid": "00ff"})));
        assert!(matches!(
            snapshot.validate::<Value>(&with_kid),
            Err(JwtError::MatchingCertNotFound { key_id }) if key_id == "00ff"
        ));

        let without_kid = format!("{}.{payload}.sig", segment(&serde_json::json!({"alg": "ES256"})));
        assert!(matches!(
            snapshot.validate::<Value>(&without_kid),
            Err(JwtError::NoValidCertFound)
        ));

        let numeric_kid = format!("{}.{payload}.sig", segment(&serde_json::json!({"alg": "ES256", "kid": 7})));
        assert!(matches!(
            snapshot.validate::<Value>(&numeric_kid),
            Err(JwtError::InvalidKeyId(_))
        ));
    }

    #[test]
    fn test_garbage_header_is_malformed() {
        let snapshot = empty_snapshot();
        assert!(matches!(
            snapshot.validate::<Value>("!!!.e30.sig"),
            Err(JwtError::Malformed(_))
        ));
    }

    #[test]
    fn test_unparsable_certificates_are_skipped() {
        let snapshot = VerifierSnapshot::build(
            vec![b"garbage".to_vec(), Vec::new()],
            vec![b"also garbage".to_vec()],
            DEFAULT_CACHE_LIFETIME,
        )
        .unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_options_builder() {
        let options = VerifierOptions::new(Duration::from_secs(60))
            .with_expected_issuer("AAS JWT Issuer")
            .with_leeway(Duration::from_secs(3));
        assert_eq!(options.cache_lifetime, Duration::from_secs(60));
        assert_eq!(options.expected_issuer.as_deref(), Some("AAS JWT Issuer"));
        assert_eq!(options.leeway, Duration::from_secs(3));
    }
}
