//! Mapping between key kinds and JWS algorithms
//!
//! Signing is strict: RSA 3072/4096 signs with RS384, P-256 with ES256 and
//! P-384 with ES384. Verification accepts the RSA family at any size so
//! tokens from older issuers keep validating.

use isecl_common::crypt::{EcCurve, KeyKind};
use jsonwebtoken::Algorithm;

use crate::{JwtError, Result};

const RSA_VERIFICATION_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Algorithm a signing key of `kind` signs with
///
/// # Errors
///
/// Returns [`JwtError::UnsupportedKey`] for RSA keys other than 3072 or 4096
/// bits and for EC curves other than P-256 and P-384.
pub fn signing_algorithm(kind: KeyKind) -> Result<Algorithm> {
    match kind {
        KeyKind::Rsa { bits: 3072 | 4096 } => Ok(Algorithm::RS384),
        KeyKind::Rsa { bits } => Err(JwtError::UnsupportedKey(format!(
            "RSA keylength for JWT signing must be 3072 or 4096, got {bits}"
        ))),
        KeyKind::Ec(EcCurve::P256) => Ok(Algorithm::ES256),
        KeyKind::Ec(EcCurve::P384) => Ok(Algorithm::ES384),
        KeyKind::Ec(curve) => Err(JwtError::UnsupportedKey(format!(
            "EC keylength for JWT signing must be 256 or 384, got {}",
            curve.bits()
        ))),
    }
}

/// Algorithms a verification key of `kind` accepts
///
/// Empty for keys no JWS algorithm exists for (P-521).
pub fn verification_algorithms(kind: KeyKind) -> &'static [Algorithm] {
    match kind {
        KeyKind::Rsa { .. } => RSA_VERIFICATION_ALGORITHMS,
        KeyKind::Ec(EcCurve::P256) => &[Algorithm::ES256],
        KeyKind::Ec(EcCurve::P384) => &[Algorithm::ES384],
        KeyKind::Ec(EcCurve::P521) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_algorithm_selection() {
        assert_eq!(signing_algorithm(KeyKind::Rsa { bits: 3072 }).unwrap(), Algorithm::RS384);
        assert_eq!(signing_algorithm(KeyKind::Rsa { bits: 4096 }).unwrap(), Algorithm::RS384);
        assert_eq!(signing_algorithm(KeyKind::Ec(EcCurve::P256)).unwrap(), Algorithm::ES256);
        assert_eq!(signing_algorithm(KeyKind::Ec(EcCurve::P384)).unwrap(), Algorithm::ES384);
    }

    #[test]
    fn test_unsupported_signing_keys() {
        for kind in [
            KeyKind::Rsa { bits: 2048 },
            KeyKind::Rsa { bits: 8192 },
            KeyKind::Ec(EcCurve::P521),
        ] {
            assert!(
                matches!(signing_algorithm(kind), Err(JwtError::UnsupportedKey(_))),
                "{kind:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_verification_algorithms() {
        assert!(verification_algorithms(KeyKind::Rsa { bits: 2048 }).contains(&Algorithm::RS384));
        assert_eq!(verification_algorithms(KeyKind::Ec(EcCurve::P256)), &[Algorithm::ES256]);
        assert!(verification_algorithms(KeyKind::Ec(EcCurve::P521)).is_empty());
    }
}
