//! Strongly-typed identifiers.
//!
//! All IDs are validated at construction time and implement common traits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define a strongly-typed ID newtype wrapper.
///
/// Generates: struct, `from_string()`, `as_str()`, Display, Serialize, Deserialize.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_string(s: String) -> Result<Self, &'static str> {
                if s.trim().is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(DeploymentId);

impl DeploymentId {
    /// Placeholder the platform API returns when it cannot resolve a deployment.
    pub const UNKNOWN: &'static str = "Unknown";

    /// Interpret a raw id coming from tool arguments or API results.
    ///
    /// Empty strings and the `Unknown` placeholder yield `None`.
    pub fn recognize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed == Self::UNKNOWN {
            return None;
        }
        Self::from_string(trimmed.to_string()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string_rejects_empty() {
        assert!(DeploymentId::from_string(String::new()).is_err());
        assert!(DeploymentId::from_string("   ".to_string()).is_err());
        assert_eq!(
            DeploymentId::from_string("dep-1".to_string()).unwrap().as_str(),
            "dep-1"
        );
    }

    #[test]
    fn test_recognize() {
        assert_eq!(DeploymentId::recognize(" dep-1 ").unwrap().as_str(), "dep-1");
        assert!(DeploymentId::recognize("Unknown").is_none());
        assert!(DeploymentId::recognize("").is_none());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = DeploymentId::from_string("dep-7".to_string()).unwrap();
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("dep-7"));
    }
}
