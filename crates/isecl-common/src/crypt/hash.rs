//! Digests and certificate thumbprints

use openssl::hash::{MessageDigest, hash};
use openssl::x509::X509Ref;

use super::x509::cert_from_pem;
use crate::Result;

/// Hash algorithms supported for data and certificate digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1, only used for certificate key identifiers
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Conventional algorithm name
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
        }
    }

    /// Digest length in bytes
    pub fn size(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub(crate) fn message_digest(self) -> MessageDigest {
        match self {
            HashAlgorithm::Sha1 => MessageDigest::sha1(),
            HashAlgorithm::Sha256 => MessageDigest::sha256(),
            HashAlgorithm::Sha384 => MessageDigest::sha384(),
            HashAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }
}

/// Hash `data` with the selected algorithm
///
/// # Errors
///
/// Returns an error if OpenSSL fails to compute the digest.
pub fn hash_data(data: &[u8], alg: HashAlgorithm) -> Result<Vec<u8>> {
    Ok(hash(alg.message_digest(), data)?.to_vec())
}

/// Hex encoded digest of the DER encoding of a certificate
///
/// With [`HashAlgorithm::Sha1`] this is the key identifier (`kid`) carried in
/// JWT headers.
///
/// # Errors
///
/// Returns an error if OpenSSL fails to compute the digest.
pub fn cert_hash_hex(cert: &X509Ref, alg: HashAlgorithm) -> Result<String> {
    let digest = cert.digest(alg.message_digest())?;
    Ok(hex::encode(&*digest))
}

/// Hex encoded digest of the first certificate in a PEM blob
///
/// # Errors
///
/// Returns an error if the PEM does not contain a certificate.
pub fn cert_hash_from_pem_hex(cert_pem: &[u8], alg: HashAlgorithm) -> Result<String> {
    let cert = cert_from_pem(cert_pem)?;
    cert_hash_hex(&cert, alg)
}
