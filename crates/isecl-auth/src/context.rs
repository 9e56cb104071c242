//! Authenticated request context

use std::time::SystemTime;

use isecl_jwt::Token;

use crate::permission::{RoleMatch, has_permission, match_roles};
use crate::types::{AuthClaims, PermissionInfo, RoleInfo};

/// Identity and privileges of an authenticated caller
///
/// Built from a validated token; handlers consult it for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthContext {
    /// Token subject (`sub`)
    pub subject: Option<String>,
    /// Token issuer (`iss`)
    pub issuer: Option<String>,
    /// Key id of the certificate the token was verified with
    pub key_id: Option<String>,
    /// Token expiry
    pub expires_at: Option<SystemTime>,
    /// Roles granted to the caller
    pub roles: Vec<RoleInfo>,
    /// Permissions granted to the caller
    pub permissions: Vec<PermissionInfo>,
}

impl AuthContext {
    /// Whether the caller holds `service`/`name` in any context
    pub fn has_role(&self, service: &str, name: &str) -> bool {
        self.roles
            .iter()
            .any(|role| role.service == service && role.name == name)
    }

    /// Whether the caller holds any of `required`
    pub fn has_any_role(&self, required: &[RoleInfo]) -> bool {
        match_roles(&self.roles, required, false).is_match()
    }

    /// Roles granted on `service`
    pub fn roles_for_service<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a RoleInfo> + 'a {
        self.roles.iter().filter(move |role| role.service == service)
    }

    /// Match the caller's roles against `required`
    ///
    /// See [`match_roles`].
    pub fn match_roles(&self, required: &[RoleInfo], empty_context_is_unrestricted: bool) -> RoleMatch {
        match_roles(&self.roles, required, empty_context_is_unrestricted)
    }

    /// Whether the caller's permissions grant `rule` on `service`
    pub fn has_permission(&self, service: &str, rule: &str) -> bool {
        has_permission(&self.permissions, service, rule)
    }

    /// Whether the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= SystemTime::now())
    }
}

impl From<Token<AuthClaims>> for AuthContext {
    fn from(token: Token<AuthClaims>) -> Self {
        let subject = token.subject().map(str::to_string);
        let issuer = token.issuer().map(str::to_string);
        let key_id = token.key_id().map(str::to_string);
        let expires_at = token.expires_at();
        let claims = token.into_claims();

        Self {
            subject,
            issuer,
            key_id,
            expires_at,
            roles: claims.roles,
            permissions: claims.permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn context() -> AuthContext {
        AuthContext {
            subject: Some("admin".to_string()),
            roles: vec![
                RoleInfo::new("AAS", "Administrator"),
                RoleInfo::new("HVS", "HostManager").with_context("type=linux"),
                RoleInfo::new("HVS", "ReportRetriever"),
            ],
            permissions: vec![PermissionInfo {
                service: "HVS".to_string(),
                context: None,
                rules: vec!["reports:*".to_string()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_role_checks() {
        let ctx = context();
        assert!(ctx.has_role("AAS", "Administrator"));
        assert!(!ctx.has_role("HVS", "Administrator"));
        assert!(ctx.has_any_role(&[RoleInfo::new("CMS", "CertApprover"), RoleInfo::new("HVS", "HostManager")]));
        assert!(!ctx.has_any_role(&[RoleInfo::new("CMS", "CertApprover")]));
        assert_eq!(ctx.roles_for_service("HVS").count(), 2);
    }

    #[test]
    fn test_role_match_and_permissions() {
        let ctx = context();
        let result = ctx.match_roles(&[RoleInfo::new("HVS", "HostManager")], true);
        assert_eq!(result.contexts().map(|c| c.len()), Some(1));
        assert!(ctx.has_permission("HVS", "reports:create"));
        assert!(!ctx.has_permission("HVS", "hosts:create"));
    }

    #[test]
    fn test_expiry() {
        let mut ctx = context();
        assert!(!ctx.is_expired());
        ctx.expires_at = Some(SystemTime::now() - Duration::from_secs(1));
        assert!(ctx.is_expired());
        ctx.expires_at = Some(SystemTime::now() + Duration::from_secs(60));
        assert!(!ctx.is_expired());
    }
}
