//! Role and permission claim types carried in ISecL tokens

use serde::{Deserialize, Serialize};

/// A role granted to a user, optionally scoped by a context
///
/// ```json
/// {"service": "HVS", "name": "HostManager", "context": "type=linux"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoleInfo {
    /// Service the role belongs to
    pub service: String,
    /// Role name within the service
    pub name: String,
    /// Restriction applied to the role; absent means unrestricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl RoleInfo {
    /// Unscoped role
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            context: None,
        }
    }

    /// Scope the role by `context`
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Context with surrounding whitespace removed, `None` if blank
    pub fn trimmed_context(&self) -> Option<&str> {
        self.context
            .as_deref()
            .map(str::trim)
            .filter(|context| !context.is_empty())
    }

    /// Whether service and name match, ignoring context
    pub fn same_role(&self, other: &RoleInfo) -> bool {
        self.service == other.service && self.name == other.name
    }
}

/// Rules a user may exercise on a service, optionally scoped by a context
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Wildcard rules such as `hosts:*` or `flavors:retrieve:*`
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Body shape of tokens that carry only roles
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleSlice {
    #[serde(default)]
    pub roles: Vec<RoleInfo>,
}

/// Custom claims of tokens issued by the authentication service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthClaims {
    #[serde(default)]
    pub roles: Vec<RoleInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<PermissionInfo>,
}

impl From<RoleSlice> for AuthClaims {
    fn from(slice: RoleSlice) -> Self {
        Self {
            roles: slice.roles,
            permissions: Vec::new(),
        }
    }
}
