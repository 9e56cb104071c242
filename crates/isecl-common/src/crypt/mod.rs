//! Certificate and key primitives
//!
//! Thin wrappers over OpenSSL that the JWT trust store and the setup tasks
//! build on:
//!
//! - `hash` - digests and certificate thumbprints
//! - `x509` - PEM parsing, expiry, self-signed CA detection, root pools
//! - `keys` - key classification and generation
//! - `cert` - certificate generation
//! - `pem` - persisting keys and certificates

pub mod cert;
pub mod hash;
pub mod keys;
pub mod pem;
pub mod x509;

pub use cert::{
    CertificateParams, create_key_pair_and_certificate, create_self_signed_ca,
    create_signed_cert,
};
pub use hash::{HashAlgorithm, cert_hash_from_pem_hex, cert_hash_hex, hash_data};
pub use keys::{
    EcCurve, KeyKind, KeyType, generate_ec_key, generate_key_pair, generate_rsa_key,
    parse_pkcs8_private_key, public_key_from_cert,
};
pub use pem::{read_pkcs8_private_key_pem, save_cert_as_pem, save_private_key_as_pkcs8};
pub use x509::{RootPool, cert_and_chain_from_pem, cert_from_pem, is_self_signed_ca, not_after};
