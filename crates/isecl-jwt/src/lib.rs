//! # isecl-jwt
//!
//! JWT issuance and verification backed by a pool of trusted signing
//! certificates.
//!
//! - [`TokenFactory`] signs tokens with an RSA or EC key, flattening the
//!   caller's claims next to the registered claims and naming the signing
//!   certificate in the `kid` header.
//! - [`VerifierSnapshot`] is an immutable trust store: signing certificates
//!   keyed by SHA-1 fingerprint, admitted only if they chain to a trusted
//!   root, with a freshness deadline.
//! - [`TokenAuthenticator`] keeps the current snapshot for the whole process
//!   and rebuilds it, fetching new certificates at most once per guard,
//!   when a token names a key it does not know.
//!
//! ## Example
//!
//! ```no_run
//! use isecl_jwt::{TokenAuthenticator, VerifierConfig};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Claims {
//!     roles: Vec<String>,
//! }
//!
//! # async fn example(token: &str) -> isecl_jwt::Result<()> {
//! let authenticator = TokenAuthenticator::from_config(&VerifierConfig::default());
//! let token = authenticator.validate::<Claims>(token).await?;
//! println!("{:?} has {} roles", token.subject(), token.claims().roles.len());
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod claims;
pub mod config;
pub mod error;
pub mod factory;
pub mod refresh;
pub mod token;
pub mod verifier;

pub use claims::StandardClaims;
pub use config::{DEFAULT_CACHE_LIFETIME, DEFAULT_TOKEN_VALIDITY, TokenFactoryConfig, VerifierConfig};
pub use error::{JwtError, Result};
pub use factory::{ISSUED_AT_GRACE, TokenFactory};
pub use refresh::{
    DirTrustMaterial, TokenAuthenticator, TrustMaterial, TrustMaterialFetcher, TrustMaterialSource,
};
pub use token::Token;
pub use verifier::{MAX_SIGNING_CERTIFICATES, TrustedKey, VerifierOptions, VerifierSnapshot};

pub use jsonwebtoken::{Algorithm, Header};
