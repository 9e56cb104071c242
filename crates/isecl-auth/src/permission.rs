//! Role and rule matching

use std::collections::HashMap;

use isecl_common::search::wildcard_matched;

use crate::types::{PermissionInfo, RoleInfo};

/// Outcome of matching a user's roles against the roles an operation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMatch {
    /// None of the required roles is held
    NoMatch,
    /// A required role is held without any context restriction
    Unrestricted,
    /// Required roles are held; keyed by their trimmed context
    ///
    /// Empty when matching roles carried no context and unrestricted
    /// results were not requested.
    Contexts(HashMap<String, RoleInfo>),
}

impl RoleMatch {
    /// Whether any required role is held
    pub fn is_match(&self) -> bool {
        !matches!(self, RoleMatch::NoMatch)
    }

    /// Context restrictions, `None` for no match or unrestricted access
    pub fn contexts(&self) -> Option<&HashMap<String, RoleInfo>> {
        match self {
            RoleMatch::Contexts(contexts) => Some(contexts),
            _ => None,
        }
    }
}

/// Match held `privileges` against `required` roles by service and name
///
/// When `empty_context_is_unrestricted` is set, the first matching role
/// without a context short-circuits to [`RoleMatch::Unrestricted`].
pub fn match_roles(
    privileges: &[RoleInfo],
    required: &[RoleInfo],
    empty_context_is_unrestricted: bool,
) -> RoleMatch {
    let mut contexts = HashMap::new();
    let mut found = false;

    for role in privileges {
        if !required.iter().any(|req| role.same_role(req)) {
            continue;
        }
        match role.trimmed_context() {
            None if empty_context_is_unrestricted => return RoleMatch::Unrestricted,
            None => {}
            Some(context) => {
                contexts.insert(context.to_string(), role.clone());
            }
        }
        found = true;
    }

    if found {
        RoleMatch::Contexts(contexts)
    } else {
        RoleMatch::NoMatch
    }
}

impl PermissionInfo {
    /// Whether any rule of this permission matches `rule`
    pub fn allows(&self, rule: &str) -> bool {
        self.rules.iter().any(|pattern| wildcard_matched(rule, pattern))
    }
}

/// Whether `permissions` grant `rule` on `service`
pub fn has_permission(permissions: &[PermissionInfo], service: &str, rule: &str) -> bool {
    permissions
        .iter()
        .filter(|permission| permission.service == service)
        .any(|permission| permission.allows(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn required() -> Vec<RoleInfo> {
        vec![
            RoleInfo::new("HVS", "HostManager"),
            RoleInfo::new("HVS", "ReportRetriever"),
        ]
    }

    #[test]
    fn test_no_match() {
        let privileges = vec![RoleInfo::new("AAS", "HostManager"), RoleInfo::new("HVS", "Other")];
        assert_eq!(match_roles(&privileges, &required(), true), RoleMatch::NoMatch);
        assert_eq!(match_roles(&[], &required(), false), RoleMatch::NoMatch);
        assert!(!RoleMatch::NoMatch.is_match());
    }

    #[test]
    fn test_unrestricted_short_circuits() {
        let privileges = vec![
            RoleInfo::new("HVS", "HostManager").with_context("type=linux"),
            RoleInfo::new("HVS", "ReportRetriever"),
        ];
        assert_eq!(match_roles(&privileges, &required(), true), RoleMatch::Unrestricted);
    }

    #[test]
    fn test_contexts_collected() {
        let privileges = vec![
            RoleInfo::new("HVS", "HostManager").with_context(" type=linux "),
            RoleInfo::new("HVS", "ReportRetriever").with_context("type=windows"),
            RoleInfo::new("HVS", "ReportRetriever"),
        ];
        let result = match_roles(&privileges, &required(), false);

        let contexts = result.contexts().unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts["type=linux"].name, "HostManager");
        assert_eq!(contexts["type=windows"].name, "ReportRetriever");
    }

    #[test]
    fn test_match_without_contexts() {
        let privileges = vec![RoleInfo::new("HVS", "HostManager").with_context("  ")];
        let result = match_roles(&privileges, &required(), false);
        assert!(result.is_match());
        assert!(result.contexts().unwrap().is_empty());
    }

    #[test]
    fn test_permission_rules() {
        let permissions = vec![
            PermissionInfo {
                service: "HVS".to_string(),
                context: None,
                rules: vec!["hosts:*".to_string(), "flavors:retrieve:?".to_string()],
            },
            PermissionInfo {
                service: "AAS".to_string(),
                context: None,
                rules: vec!["*".to_string()],
            },
        ];

        assert!(has_permission(&permissions, "HVS", "hosts:create"));
        assert!(has_permission(&permissions, "HVS", "flavors:retrieve:1"));
        assert!(!has_permission(&permissions, "HVS", "flavors:retrieve:12"));
        assert!(!has_permission(&permissions, "HVS", "flavors:delete"));
        assert!(has_permission(&permissions, "AAS", "users:delete"));
        assert!(!has_permission(&permissions, "CMS", "certificates:sign"));
    }
}
