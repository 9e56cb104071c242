//! Standard claims and the flattened token body
//!
//! Tokens carry the caller's claims and the registered claims as siblings at
//! the top level of the body. Services decoding ISecL tokens rely on that
//! layout, so custom claims are never nested under a sub-object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{JwtError, Result};

/// Registered JWT claims per RFC 7519
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StandardClaims {
    /// Issuer (iss) - identifies who issued the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject (sub) - identifies the principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration Time (exp) - Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Not Before (nbf) - Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// Issued At (iat) - Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// JWT ID (jti)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Build the token body from custom claims and standard claims
///
/// The custom claims must serialize to a JSON object (or to `null`, which is
/// treated as no custom claims). Standard claims win over custom fields with
/// the same name.
pub(crate) fn merge_claims<C: Serialize + ?Sized>(
    custom: &C,
    standard: &StandardClaims,
) -> Result<Map<String, Value>> {
    let mut body = match serde_json::to_value(custom).map_err(|e| JwtError::Claims(e.to_string()))? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(JwtError::Claims(format!(
                "custom claims must serialize to a JSON object, got {}",
                json_type(&other)
            )));
        }
    };

    if let Value::Object(standard) =
        serde_json::to_value(standard).map_err(|e| JwtError::Claims(e.to_string()))?
    {
        body.extend(standard);
    }
    Ok(body)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
