//! # isecl-auth
//!
//! Authorization helpers layered on [`isecl_jwt`]: the role and permission
//! claim types issued by the authentication service, role and rule
//! matching, and bearer token authentication of HTTP requests into an
//! [`AuthContext`].

pub mod context;
pub mod error;
pub mod middleware;
pub mod permission;
pub mod types;

pub use context::AuthContext;
pub use error::{AuthError, Result};
pub use middleware::{BearerAuthenticator, bearer_token};
pub use permission::{RoleMatch, has_permission, match_roles};
pub use types::{AuthClaims, PermissionInfo, RoleInfo, RoleSlice};
