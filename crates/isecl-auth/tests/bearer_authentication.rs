//! End-to-end bearer authentication against a directory trust store

use std::sync::Arc;

use http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION};
use isecl_auth::{AuthClaims, AuthError, BearerAuthenticator, PermissionInfo, RoleInfo, RoleMatch};
use isecl_common::crypt::{CertificateParams, EcCurve, create_self_signed_ca, generate_ec_key};
use isecl_jwt::{DirTrustMaterial, TokenAuthenticator, TokenFactory, VerifierOptions};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    factory: TokenFactory,
    authenticator: BearerAuthenticator,
}

impl Fixture {
    /// Trust directory holding one signing certificate and a factory for it
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let key = generate_ec_key(EcCurve::P384).unwrap();
        let params = CertificateParams::new("AAS JWT Signing", chrono::Duration::days(1));
        let cert = create_self_signed_ca(&params, &key).unwrap();
        let cert_pem = cert.to_pem().unwrap();
        std::fs::write(dir.path().join("jwt-signing.pem"), &cert_pem).unwrap();

        let factory = TokenFactory::new(
            &key.private_key_to_pkcs8().unwrap(),
            true,
            Some(&cert_pem),
            "AAS JWT Issuer",
            None,
        )
        .unwrap();
        let tokens = TokenAuthenticator::new(
            DirTrustMaterial::new(dir.path(), dir.path().join("trustedca")),
            VerifierOptions::default().with_expected_issuer("AAS JWT Issuer"),
        );

        Self {
            _dir: dir,
            factory,
            authenticator: BearerAuthenticator::new(Arc::new(tokens)),
        }
    }

    fn headers(&self, claims: &AuthClaims, subject: &str) -> HeaderMap {
        let token = self.factory.create(claims, subject, None).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }
}

fn admin_claims() -> AuthClaims {
    AuthClaims {
        roles: vec![
            RoleInfo::new("AAS", "Administrator"),
            RoleInfo::new("HVS", "HostManager").with_context("type=linux"),
        ],
        permissions: vec![PermissionInfo {
            service: "HVS".to_string(),
            context: None,
            rules: vec!["hosts:*".to_string()],
        }],
    }
}

#[tokio::test]
async fn test_authenticated_context() {
    // GIVEN: A request carrying a token with roles and permissions
    let fixture = Fixture::new();
    let headers = fixture.headers(&admin_claims(), "admin");

    // WHEN: The request is authenticated
    let ctx = fixture.authenticator.authenticate(&headers).await.unwrap();

    // THEN: The context carries the token identity and privileges
    assert_eq!(ctx.subject.as_deref(), Some("admin"));
    assert_eq!(ctx.issuer.as_deref(), Some("AAS JWT Issuer"));
    assert_eq!(ctx.key_id.as_deref(), fixture.factory.key_id());
    assert_eq!(ctx.roles, admin_claims().roles);
    assert!(ctx.has_role("AAS", "Administrator"));
    assert!(ctx.has_permission("HVS", "hosts:delete"));
    assert!(!ctx.is_expired());

    let result = ctx.match_roles(&[RoleInfo::new("HVS", "HostManager")], true);
    assert!(matches!(result, RoleMatch::Contexts(ref contexts) if contexts.contains_key("type=linux")));
}

#[tokio::test]
async fn test_missing_header() {
    let fixture = Fixture::new();

    let error = fixture.authenticator.authenticate(&HeaderMap::new()).await.unwrap_err();
    assert!(matches!(error, AuthError::MissingBearerToken));
    assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert!(matches!(
        fixture.authenticator.authenticate(&headers).await,
        Err(AuthError::MissingBearerToken)
    ));
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let fixture = Fixture::new();
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not.a.token"));

    let error = fixture.authenticator.authenticate(&headers).await.unwrap_err();
    assert!(matches!(error, AuthError::Unauthorized(_)));
    assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_untrusted_signer_is_unauthorized() {
    // GIVEN: A token from a key whose certificate is not in the trust directory
    let fixture = Fixture::new();
    let key = generate_ec_key(EcCurve::P256).unwrap();
    let params = CertificateParams::new("Rogue Signer", chrono::Duration::days(1));
    let cert = create_self_signed_ca(&params, &key).unwrap();
    let rogue = TokenFactory::new(
        &key.private_key_to_pkcs8().unwrap(),
        true,
        Some(&cert.to_pem().unwrap()),
        "AAS JWT Issuer",
        None,
    )
    .unwrap();
    let token = rogue.create(&admin_claims(), "admin", None).unwrap();

    // WHEN: It is presented
    let error = fixture.authenticator.authenticate_token(&token).await.unwrap_err();

    // THEN: The unknown key id is rejected with 401
    assert!(matches!(
        error,
        AuthError::Unauthorized(isecl_jwt::JwtError::MatchingCertNotFound { .. })
    ));
}
