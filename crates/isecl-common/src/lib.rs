//! # ISecL Common
//!
//! Small building blocks shared by the ISecL services and by the
//! `isecl-jwt` trust store:
//!
//! - [`crypt`] - PEM/X.509 parsing, certificate hashing, root pool path
//!   validation, key classification and certificate generation
//! - [`os`] - reading PEM files out of trust directories
//! - [`search`] - `*` / `?` wildcard matching
//!
//! Certificate work is delegated to OpenSSL.

pub mod crypt;
pub mod error;
pub mod os;
pub mod search;

pub use error::{CryptError, Result};
