//! X.509 parsing and path validation
//!
//! Path validation is OpenSSL's (`X509_verify_cert`); this module only
//! assembles the store and the untrusted intermediates.

use chrono::{DateTime, Utc};
use openssl::asn1::Asn1Time;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509, X509Ref, X509StoreContext, X509VerifyResult};
use tracing::{debug, warn};

use crate::{CryptError, Result};

/// Parse the first certificate of a PEM blob
///
/// # Errors
///
/// Returns [`CryptError::Pem`] if no certificate can be decoded.
pub fn cert_from_pem(cert_pem: &[u8]) -> Result<X509> {
    X509::from_pem(cert_pem).map_err(|e| CryptError::Pem(format!("certificate: {e}")))
}

/// Parse a PEM blob holding a certificate followed by its chain
///
/// The first block is returned as the leaf, the remaining blocks as
/// untrusted intermediates in file order.
///
/// # Errors
///
/// Returns [`CryptError::Pem`] if the blob holds no certificate.
pub fn cert_and_chain_from_pem(cert_pem: &[u8]) -> Result<(X509, Vec<X509>)> {
    let mut certs =
        X509::stack_from_pem(cert_pem).map_err(|e| CryptError::Pem(format!("certificate chain: {e}")))?;
    if certs.is_empty() {
        return Err(CryptError::Pem("no certificate found in PEM".to_string()));
    }
    let leaf = certs.remove(0);
    Ok((leaf, certs))
}

/// Expiry (`notAfter`) of a certificate
///
/// # Errors
///
/// Returns an error if the validity field cannot be compared with the epoch.
pub fn not_after(cert: &X509Ref) -> Result<DateTime<Utc>> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(cert.not_after())?;
    let seconds = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| CryptError::InvalidValidity(format!("notAfter out of range: {seconds}")))
}

/// Whether the certificate is a CA that signed itself
///
/// Requires the basic constraints CA flag, matching subject and issuer, and
/// a self-signature that verifies with the certificate's own key.
///
/// # Errors
///
/// Returns an error if the certificate cannot be re-parsed for its
/// extensions or its public key cannot be extracted.
pub fn is_self_signed_ca(cert: &X509Ref) -> Result<bool> {
    let der = cert.to_der()?;
    let (_, parsed) = x509_parser::parse_x509_certificate(&der)
        .map_err(|e| CryptError::X509Parse(e.to_string()))?;

    let is_ca = matches!(parsed.basic_constraints(), Ok(Some(bc)) if bc.value.ca);
    if !is_ca {
        return Ok(false);
    }
    if cert.issued(cert) != X509VerifyResult::OK {
        return Ok(false);
    }
    let key = cert.public_key()?;
    Ok(cert.verify(&key)?)
}

/// Pool of trusted root certificates
///
/// Built once per trust store refresh from every PEM blob found in the
/// trusted CA directory. Each blob may carry several certificates.
pub struct RootPool {
    store: X509Store,
    len: usize,
}

impl std::fmt::Debug for RootPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootPool")
            .field("len", &self.len)
            .field("store", &"<X509Store>")
            .finish()
    }
}

impl RootPool {
    /// Build a pool from PEM blobs; blobs that fail to parse are skipped
    ///
    /// # Errors
    ///
    /// Returns an error only if the OpenSSL store itself cannot be created.
    pub fn from_pems<I, P>(pems: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut builder = X509StoreBuilder::new()?;
        let mut len = 0;
        for pem in pems {
            let certs = match X509::stack_from_pem(pem.as_ref()) {
                Ok(certs) => certs,
                Err(e) => {
                    warn!(error = %e, "Skipping unparsable root CA PEM");
                    continue;
                }
            };
            for cert in certs {
                // Duplicate roots are rejected by some OpenSSL versions
                if let Err(e) = builder.add_cert(cert) {
                    debug!(error = %e, "Root CA not added to pool");
                    continue;
                }
                len += 1;
            }
        }
        Ok(Self {
            store: builder.build(),
            len,
        })
    }

    /// Number of root certificates in the pool
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no roots
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Verify `cert` up to one of the roots, using `intermediates` as
    /// untrusted chain material
    ///
    /// Returns `Ok(false)` when OpenSSL rejects the path.
    ///
    /// # Errors
    ///
    /// Returns an error if the verification context cannot be set up.
    pub fn verify(&self, cert: &X509Ref, intermediates: &[X509]) -> Result<bool> {
        let mut chain = Stack::new()?;
        for intermediate in intermediates {
            chain.push(intermediate.clone())?;
        }
        let mut context = X509StoreContext::new()?;
        let verified = context.init(&self.store, cert, &chain, |c| {
            let ok = c.verify_cert()?;
            if !ok {
                debug!(reason = %c.error(), "Certificate path validation failed");
            }
            Ok(ok)
        })?;
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::cert::{CertificateParams, create_self_signed_ca, create_signed_cert};
    use crate::crypt::keys::{EcCurve, generate_ec_key};
    use chrono::Duration;

    fn ca() -> (openssl::pkey::PKey<openssl::pkey::Private>, X509) {
        let key = generate_ec_key(EcCurve::P256).unwrap();
        let cert = create_self_signed_ca(
            &CertificateParams::new("Test Root CA", Duration::days(1)),
            &key,
        )
        .unwrap();
        (key, cert)
    }

    #[test]
    fn test_cert_and_chain_order() {
        let (ca_key, ca_cert) = ca();
        let leaf_key = generate_ec_key(EcCurve::P256).unwrap();
        let leaf = create_signed_cert(
            &CertificateParams::new("leaf", Duration::days(1)),
            &leaf_key,
            &ca_cert,
            &ca_key,
        )
        .unwrap();

        let mut pem = leaf.to_pem().unwrap();
        pem.extend(ca_cert.to_pem().unwrap());

        let (parsed_leaf, chain) = cert_and_chain_from_pem(&pem).unwrap();
        assert_eq!(parsed_leaf.to_der().unwrap(), leaf.to_der().unwrap());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].to_der().unwrap(), ca_cert.to_der().unwrap());
    }

    #[test]
    fn test_empty_pem_is_error() {
        assert!(cert_and_chain_from_pem(b"").is_err());
        assert!(cert_from_pem(b"-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n").is_err());
    }

    #[test]
    fn test_self_signed_ca_detection() {
        let (ca_key, ca_cert) = ca();
        assert!(is_self_signed_ca(&ca_cert).unwrap());

        let leaf_key = generate_ec_key(EcCurve::P256).unwrap();
        let leaf = create_signed_cert(
            &CertificateParams::new("leaf", Duration::days(1)),
            &leaf_key,
            &ca_cert,
            &ca_key,
        )
        .unwrap();
        assert!(!is_self_signed_ca(&leaf).unwrap());
    }

    #[test]
    fn test_not_after_matches_params() {
        let key = generate_ec_key(EcCurve::P256).unwrap();
        let params = CertificateParams::new("expiry", Duration::hours(5));
        let cert = create_self_signed_ca(&params, &key).unwrap();
        assert_eq!(not_after(&cert).unwrap().timestamp(), params.not_after.timestamp());
    }

    #[test]
    fn test_root_pool_verification() {
        let (ca_key, ca_cert) = ca();
        let (_, other_ca) = ca();
        let leaf_key = generate_ec_key(EcCurve::P256).unwrap();
        let leaf = create_signed_cert(
            &CertificateParams::new("leaf", Duration::days(1)),
            &leaf_key,
            &ca_cert,
            &ca_key,
        )
        .unwrap();

        let pool = RootPool::from_pems([ca_cert.to_pem().unwrap()]).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(pool.verify(&leaf, &[]).unwrap());

        let wrong_pool = RootPool::from_pems([other_ca.to_pem().unwrap()]).unwrap();
        assert!(!wrong_pool.verify(&leaf, &[]).unwrap());

        let empty = RootPool::from_pems(Vec::<Vec<u8>>::new()).unwrap();
        assert!(empty.is_empty());
        assert!(!empty.verify(&leaf, &[]).unwrap());
    }

    #[test]
    fn test_root_pool_skips_garbage() {
        let (_, ca_cert) = ca();
        let pool =
            RootPool::from_pems([b"garbage".to_vec(), ca_cert.to_pem().unwrap()]).unwrap();
        assert_eq!(pool.len(), 1);
    }
}
