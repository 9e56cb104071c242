//! Validated token handle

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, Header};
use serde_json::{Map, Value};

use crate::claims::StandardClaims;

/// A token whose signature and standard claims have been verified
///
/// `C` is the caller's claims type decoded from the flattened body.
#[derive(Debug, Clone)]
pub struct Token<C> {
    pub(crate) header: Header,
    pub(crate) standard_claims: StandardClaims,
    pub(crate) all_claims: Map<String, Value>,
    pub(crate) claims: C,
}

impl<C> Token<C> {
    /// JOSE header of the token
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Key id (`kid`) that selected the verification key
    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }

    /// Signing algorithm from the header
    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// Registered claims
    pub fn standard_claims(&self) -> &StandardClaims {
        &self.standard_claims
    }

    /// The complete token body, custom and standard claims alike
    pub fn all_claims(&self) -> &Map<String, Value> {
        &self.all_claims
    }

    /// Caller claims decoded from the body
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// Consume the token, keeping the caller claims
    pub fn into_claims(self) -> C {
        self.claims
    }

    /// Subject (`sub`)
    pub fn subject(&self) -> Option<&str> {
        self.standard_claims.sub.as_deref()
    }

    /// Issuer (`iss`)
    pub fn issuer(&self) -> Option<&str> {
        self.standard_claims.iss.as_deref()
    }

    /// When the token was issued
    pub fn issued_at(&self) -> Option<SystemTime> {
        self.standard_claims
            .iat
            .map(|iat| UNIX_EPOCH + Duration::from_secs(iat))
    }

    /// When the token expires
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.standard_claims
            .exp
            .map(|exp| UNIX_EPOCH + Duration::from_secs(exp))
    }
}
