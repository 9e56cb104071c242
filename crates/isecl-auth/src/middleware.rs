//! Bearer token authentication of HTTP requests

use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use isecl_jwt::TokenAuthenticator;
use tracing::{debug, error, warn};

use crate::context::AuthContext;
use crate::error::{AuthError, Result};
use crate::types::AuthClaims;

/// Extract the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively. Returns `None` for other
/// schemes and for an empty token.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authenticates requests by their bearer token
#[derive(Debug, Clone)]
pub struct BearerAuthenticator {
    authenticator: Arc<TokenAuthenticator>,
}

impl BearerAuthenticator {
    /// Wrap a shared token authenticator
    pub fn new(authenticator: Arc<TokenAuthenticator>) -> Self {
        Self { authenticator }
    }

    /// The shared token authenticator
    pub fn authenticator(&self) -> &Arc<TokenAuthenticator> {
        &self.authenticator
    }

    /// Authenticate a request from its headers
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingBearerToken`] without a usable `Authorization`
    /// header, otherwise the mapped validation failure.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                warn!("No bearer token provided for authorization");
                AuthError::MissingBearerToken
            })?;
        self.authenticate_token(token).await
    }

    /// Authenticate a raw token
    ///
    /// # Errors
    ///
    /// Returns the validation failure mapped to [`AuthError`].
    pub async fn authenticate_token(&self, token: &str) -> Result<AuthContext> {
        match self.authenticator.validate::<AuthClaims>(token).await {
            Ok(token) => {
                let ctx = AuthContext::from(token);
                debug!(
                    subject = ctx.subject.as_deref().unwrap_or("-"),
                    roles = ctx.roles.len(),
                    "Request authenticated"
                );
                Ok(ctx)
            }
            Err(e) => {
                let error = AuthError::from(e);
                match &error {
                    AuthError::Internal(_) => error!(error = %error, "Token verifier unavailable"),
                    _ => warn!(category = error.category(), "Token validation failure"),
                }
                Err(error)
            }
        }
    }
}
