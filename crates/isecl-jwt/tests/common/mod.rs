//! Shared helpers for JWT integration tests
//!
//! Builds signing identities (key plus certificate) and trust hierarchies on
//! the fly so tests never depend on checked-in key material.

#![allow(dead_code)]

use std::path::Path;

use chrono::{Duration, Utc};
use isecl_common::crypt::{
    CertificateParams, EcCurve, HashAlgorithm, cert_hash_hex, create_self_signed_ca,
    create_signed_cert, generate_ec_key, generate_rsa_key,
};
use isecl_jwt::TokenFactory;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

/// Issuer stamped on test tokens
pub const ISSUER: &str = "AAS JWT Issuer";

/// A private key and the certificate that carries its public half
pub struct SigningIdentity {
    pub key: PKey<Private>,
    pub cert: X509,
}

impl SigningIdentity {
    /// Self-signed CA identity on P-256, valid for a day
    pub fn ec() -> Self {
        Self::self_signed(generate_ec_key(EcCurve::P256).unwrap(), Duration::days(1))
    }

    /// Self-signed CA identity on P-384, valid for a day
    pub fn ec384() -> Self {
        Self::self_signed(generate_ec_key(EcCurve::P384).unwrap(), Duration::days(1))
    }

    /// Self-signed CA identity with an RSA key of `bits`, valid for a day
    pub fn rsa(bits: u32) -> Self {
        Self::self_signed(generate_rsa_key(bits).unwrap(), Duration::days(1))
    }

    /// Self-signed CA identity valid from now for `validity`
    pub fn self_signed(key: PKey<Private>, validity: Duration) -> Self {
        let params = CertificateParams::new("JWT Signing Certificate", validity).with_organization("INTEL");
        let cert = create_self_signed_ca(&params, &key).unwrap();
        Self { key, cert }
    }

    /// Self-signed CA identity whose certificate expired yesterday
    pub fn expired() -> Self {
        let key = generate_ec_key(EcCurve::P256).unwrap();
        let now = Utc::now();
        let params = CertificateParams::new("Expired JWT Signing Certificate", Duration::days(1))
            .with_validity(now - Duration::days(2), now - Duration::days(1));
        let cert = create_self_signed_ca(&params, &key).unwrap();
        Self { key, cert }
    }

    /// End-entity identity on P-256 issued by `ca`
    pub fn issued_by(ca: &SigningIdentity) -> Self {
        let key = generate_ec_key(EcCurve::P256).unwrap();
        let params = CertificateParams::new("JWT Signing Leaf", Duration::days(1));
        let cert = create_signed_cert(&params, &key, &ca.cert, &ca.key).unwrap();
        Self { key, cert }
    }

    pub fn pkcs8_der(&self) -> Vec<u8> {
        self.key.private_key_to_pkcs8().unwrap()
    }

    pub fn cert_pem(&self) -> Vec<u8> {
        self.cert.to_pem().unwrap()
    }

    /// Hex SHA-1 fingerprint, the `kid` tokens from this identity carry
    pub fn key_id(&self) -> String {
        cert_hash_hex(&self.cert, HashAlgorithm::Sha1).unwrap()
    }

    /// Factory signing with this identity and naming its certificate
    pub fn factory(&self) -> TokenFactory {
        TokenFactory::new(&self.pkcs8_der(), true, Some(&self.cert_pem()), ISSUER, None).unwrap()
    }

    /// Factory signing with this identity without a `kid`
    pub fn factory_without_key_id(&self) -> TokenFactory {
        TokenFactory::new(&self.pkcs8_der(), false, None, ISSUER, None).unwrap()
    }

    /// Write the certificate PEM to `dir/name`
    pub fn write_cert(&self, dir: &Path, name: &str) {
        std::fs::write(dir.join(name), self.cert_pem()).unwrap();
    }
}

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("isecl_jwt=debug")
        .with_test_writer()
        .try_init();
}
