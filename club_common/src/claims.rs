use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::permissions::{self, AccessError, Permission, RegionScope};

/// The authenticated caller, as passed on by the API Gateway authorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub sub: String,
    pub email: Option<String>,
    pub groups: Vec<String>,
}

impl Principal {
    /// Reads the caller from the `authorizer` section of an API Gateway REST
    /// request context. Both our own TOKEN authorizer (`principalId`, `email`,
    /// `groups`) and the Cognito user pool authorizer (`claims`) are understood.
    pub fn from_authorizer(authorizer: &HashMap<String, Value>) -> Option<Principal> {
        if let Some(Value::Object(claims)) = authorizer.get("claims") {
            let sub = non_empty(claims.get("sub"))?;
            return Some(Principal {
                sub,
                email: non_empty(claims.get("email")),
                groups: claims.get("cognito:groups").map(parse_groups).unwrap_or_default(),
            });
        }
        let sub = non_empty(authorizer.get("sub")).or_else(|| non_empty(authorizer.get("principalId")))?;
        Some(Principal {
            sub,
            email: non_empty(authorizer.get("email")),
            groups: authorizer.get("groups").map(parse_groups).unwrap_or_default(),
        })
    }

    pub fn require(&self, required: &[Permission]) -> Result<RegionScope, AccessError> {
        permissions::validate_permissions_with_regions(self.groups.as_slice(), required)
    }

    pub fn has(&self, permission: Permission) -> bool {
        permissions::has_permission(self.groups.as_slice(), permission)
    }

    pub fn permissions(&self) -> BTreeSet<Permission> {
        permissions::effective_permissions(self.groups.as_slice())
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .map_or(false, |own| own.eq_ignore_ascii_case(email.trim()))
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Group claims arrive as a JSON array, a comma separated string, or (via the
/// Cognito authorizer) as `[a b c]`.
pub fn parse_groups(value: &Value) -> Vec<String> {
    match value {
        Value::Array(values) => values
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![],
    }
}
