//! Key classification and generation
//!
//! Only RSA and ECDSA keys are recognised anywhere in the ISecL stack.

use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use openssl::x509::X509Ref;

use crate::{CryptError, Result};

/// NIST curves understood by the key helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    /// NIST P-256 (prime256v1)
    P256,
    /// NIST P-384 (secp384r1)
    P384,
    /// NIST P-521 (secp521r1)
    P521,
}

impl EcCurve {
    /// Curve size in bits
    pub fn bits(self) -> u32 {
        match self {
            EcCurve::P256 => 256,
            EcCurve::P384 => 384,
            EcCurve::P521 => 521,
        }
    }

    fn nid(self) -> Nid {
        match self {
            EcCurve::P256 => Nid::X9_62_PRIME256V1,
            EcCurve::P384 => Nid::SECP384R1,
            EcCurve::P521 => Nid::SECP521R1,
        }
    }

    fn from_nid(nid: Nid) -> Option<Self> {
        match nid {
            Nid::X9_62_PRIME256V1 => Some(EcCurve::P256),
            Nid::SECP384R1 => Some(EcCurve::P384),
            Nid::SECP521R1 => Some(EcCurve::P521),
            _ => None,
        }
    }
}

/// Type and size of an asymmetric key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// RSA key with its modulus length
    Rsa {
        /// Modulus length in bits
        bits: u32,
    },
    /// ECDSA key on a named curve
    Ec(EcCurve),
}

impl KeyKind {
    /// Classify a private or public key
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::UnsupportedKey`] for anything but RSA keys and
    /// ECDSA keys on P-256, P-384 or P-521.
    pub fn of<T: HasPublic>(key: &PKeyRef<T>) -> Result<Self> {
        match key.id() {
            Id::RSA => {
                let rsa = key.rsa()?;
                Ok(KeyKind::Rsa {
                    bits: rsa.n().num_bits() as u32,
                })
            }
            Id::EC => {
                let ec = key.ec_key()?;
                let nid = ec.group().curve_name().ok_or_else(|| {
                    CryptError::UnsupportedKey("EC key without a named curve".to_string())
                })?;
                EcCurve::from_nid(nid).map(KeyKind::Ec).ok_or_else(|| {
                    CryptError::UnsupportedKey(format!("EC curve {:?} not supported", nid))
                })
            }
            other => Err(CryptError::UnsupportedKey(format!(
                "key type {:?} not supported, only RSA and ECDSA",
                other
            ))),
        }
    }
}

/// Key family requested from [`generate_key_pair`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// RSA
    Rsa,
    /// ECDSA
    Ec,
}

impl std::str::FromStr for KeyType {
    type Err = CryptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => Ok(KeyType::Rsa),
            "ec" | "ecdsa" => Ok(KeyType::Ec),
            other => Err(CryptError::UnsupportedKey(format!("key type '{other}'"))),
        }
    }
}

/// Parse a PKCS8 DER encoded private key
///
/// # Errors
///
/// Returns an error if the bytes are not a PKCS8 private key.
pub fn parse_pkcs8_private_key(pkcs8_der: &[u8]) -> Result<PKey<Private>> {
    Ok(PKey::private_key_from_pkcs8(pkcs8_der)?)
}

/// Public key of a certificate
///
/// # Errors
///
/// Returns [`CryptError::UnsupportedKey`] unless the key is RSA or ECDSA.
pub fn public_key_from_cert(cert: &X509Ref) -> Result<PKey<Public>> {
    let key = cert.public_key()?;
    match key.id() {
        Id::RSA | Id::EC => Ok(key),
        other => Err(CryptError::UnsupportedKey(format!(
            "certificate key type {:?}, only RSA and ECDSA public keys are supported",
            other
        ))),
    }
}

/// Generate an RSA key of `bits` length
///
/// # Errors
///
/// Returns an error if OpenSSL rejects the key length.
pub fn generate_rsa_key(bits: u32) -> Result<PKey<Private>> {
    Ok(PKey::from_rsa(Rsa::generate(bits)?)?)
}

/// Generate an ECDSA key on `curve`
///
/// # Errors
///
/// Returns an error if OpenSSL fails to generate the key.
pub fn generate_ec_key(curve: EcCurve) -> Result<PKey<Private>> {
    let group = EcGroup::from_curve_name(curve.nid())?;
    Ok(PKey::from_ec_key(EcKey::generate(&group)?)?)
}

/// Generate a key pair for service certificates
///
/// RSA keys are 4096 bits when asked for, 3072 otherwise. ECDSA keys use
/// P-384, or P-521 when `bits` is 512 or more.
///
/// # Errors
///
/// Returns an error if OpenSSL fails to generate the key.
pub fn generate_key_pair(key_type: KeyType, bits: u32) -> Result<PKey<Private>> {
    match key_type {
        KeyType::Rsa => generate_rsa_key(if bits == 4096 { 4096 } else { 3072 }),
        KeyType::Ec if bits >= 512 => generate_ec_key(EcCurve::P521),
        KeyType::Ec => generate_ec_key(EcCurve::P384),
    }
}
