//! Certificate generation
//!
//! Used by setup tasks to mint self-signed service certificates and by
//! tests to build trust hierarchies on the fly.

use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPublic, PKeyRef, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509, X509Builder, X509NameBuilder, X509Ref};

use super::keys::{EcCurve, KeyKind, KeyType, generate_key_pair};
use crate::{CryptError, Result};

/// Default validity of generated service certificates
const DEFAULT_CERT_VALIDITY_DAYS: i64 = 365;

/// Subject and validity of a certificate to generate
#[derive(Debug, Clone)]
pub struct CertificateParams {
    /// Subject common name
    pub common_name: String,
    /// Subject organization
    pub organization: Option<String>,
    /// DNS names or IP addresses for the subject alternative name extension
    pub hosts: Vec<String>,
    /// Start of validity
    pub not_before: DateTime<Utc>,
    /// End of validity
    pub not_after: DateTime<Utc>,
}

impl CertificateParams {
    /// Certificate valid from now for `validity`
    pub fn new(common_name: impl Into<String>, validity: Duration) -> Self {
        let now = Utc::now();
        Self {
            common_name: common_name.into(),
            organization: None,
            hosts: Vec::new(),
            not_before: now,
            not_after: now + validity,
        }
    }

    /// Set the subject organization
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the subject alternative names from a comma separated host list
    pub fn with_hosts(mut self, host_list: &str) -> Self {
        self.hosts = host_list
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Replace the validity window
    pub fn with_validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }
}

/// Create a self-signed CA certificate for `key`
///
/// # Errors
///
/// Returns an error if the validity window is empty or OpenSSL fails to
/// build or sign the certificate.
pub fn create_self_signed_ca(
    params: &CertificateParams,
    key: &PKeyRef<Private>,
) -> Result<X509> {
    build_certificate(params, key, None, key, true)
}

/// Create a certificate for `public_key` signed by `issuer`
///
/// The issued certificate is an end-entity certificate (no CA flag).
///
/// # Errors
///
/// Returns an error if the validity window is empty or OpenSSL fails to
/// build or sign the certificate.
pub fn create_signed_cert<T: HasPublic>(
    params: &CertificateParams,
    public_key: &PKeyRef<T>,
    issuer: &X509Ref,
    issuer_key: &PKeyRef<Private>,
) -> Result<X509> {
    build_certificate(params, public_key, Some(issuer), issuer_key, false)
}

/// Generate a key pair and a one year self-signed certificate
///
/// `subject` becomes the organization, `host_list` is split on commas into
/// IP and DNS subject alternative names. Returns the DER certificate and the
/// PKCS8 DER private key.
///
/// # Errors
///
/// Returns an error if key generation or certificate signing fails.
pub fn create_key_pair_and_certificate(
    subject: &str,
    host_list: &str,
    key_type: KeyType,
    bits: u32,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let key = generate_key_pair(key_type, bits)?;
    let params = CertificateParams::new(subject, Duration::days(DEFAULT_CERT_VALIDITY_DAYS))
        .with_organization(subject)
        .with_hosts(host_list);
    let cert = create_self_signed_ca(&params, &key)?;
    Ok((cert.to_der()?, key.private_key_to_pkcs8()?))
}

fn signature_digest<T: HasPublic>(key: &PKeyRef<T>) -> Result<MessageDigest> {
    Ok(match KeyKind::of(key)? {
        KeyKind::Rsa { .. } => MessageDigest::sha384(),
        KeyKind::Ec(EcCurve::P256) => MessageDigest::sha256(),
        KeyKind::Ec(EcCurve::P384) => MessageDigest::sha384(),
        KeyKind::Ec(EcCurve::P521) => MessageDigest::sha512(),
    })
}

fn build_certificate<T: HasPublic>(
    params: &CertificateParams,
    public_key: &PKeyRef<T>,
    issuer: Option<&X509Ref>,
    signing_key: &PKeyRef<Private>,
    is_ca: bool,
) -> Result<X509> {
    if params.not_after <= params.not_before {
        return Err(CryptError::InvalidValidity(format!(
            "notAfter {} is not after notBefore {}",
            params.not_after, params.not_before
        )));
    }

    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;

    let mut serial = BigNum::new()?;
    serial.rand(127, MsbOption::MAYBE_ZERO, false)?;
    builder.set_serial_number(serial.to_asn1_integer()?.as_ref())?;

    let mut name = X509NameBuilder::new()?;
    if let Some(organization) = &params.organization {
        name.append_entry_by_text("O", organization)?;
    }
    name.append_entry_by_text("CN", &params.common_name)?;
    let name = name.build();
    builder.set_subject_name(&name)?;
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.subject_name())?,
        None => builder.set_issuer_name(&name)?,
    }

    builder.set_pubkey(public_key)?;
    builder.set_not_before(Asn1Time::from_unix(params.not_before.timestamp())?.as_ref())?;
    builder.set_not_after(Asn1Time::from_unix(params.not_after.timestamp())?.as_ref())?;

    if is_ca {
        builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
        builder.append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .digital_signature()
                .build()?,
        )?;
    } else {
        builder.append_extension(BasicConstraints::new().build()?)?;
        builder.append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .key_encipherment()
                .build()?,
        )?;
    }

    let subject_key_id =
        SubjectKeyIdentifier::new().build(&builder.x509v3_context(issuer, None))?;
    builder.append_extension(subject_key_id)?;

    if issuer.is_some() {
        let authority_key_id = AuthorityKeyIdentifier::new()
            .keyid(false)
            .issuer(false)
            .build(&builder.x509v3_context(issuer, None))?;
        builder.append_extension(authority_key_id)?;
    }

    if !params.hosts.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for host in &params.hosts {
            if host.parse::<IpAddr>().is_ok() {
                san.ip(host);
            } else {
                san.dns(host);
            }
        }
        let san = san.build(&builder.x509v3_context(issuer, None))?;
        builder.append_extension(san)?;
    }

    builder.sign(signing_key, signature_digest(signing_key)?)?;
    Ok(builder.build())
}
