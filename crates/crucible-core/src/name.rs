//! Validated tool names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated tool identifier matching `^[a-z][a-z0-9._-]+$`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

/// A tool name failed the `^[a-z][a-z0-9._-]+$` pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tool name {0:?}: must match ^[a-z][a-z0-9._-]+$")]
pub struct InvalidToolName(String);

impl ToolName {
    /// Parse and validate a tool name.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidToolName> {
        let raw = raw.into();
        if is_valid(&raw) {
            Ok(Self(raw))
        } else {
            Err(InvalidToolName(raw))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
}

impl TryFrom<String> for ToolName {
    type Error = InvalidToolName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["t.echo", "t-sum", "a", "t_sleep9", "namespace.tool-name"] {
            assert!(ToolName::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        for name in ["", "Echo", "1tool", "has space", "UPPER.case"] {
            assert!(ToolName::parse(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn display_matches_input() {
        let n = ToolName::parse("t.echo").unwrap();
        assert_eq!(n.to_string(), "t.echo");
    }

    #[test]
    fn serde_roundtrip() {
        let n = ToolName::parse("t.echo").unwrap();
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"t.echo\"");
        let back: ToolName = serde_json::from_str(&json).unwrap();
        assert_eq!(n, back);
    }

    #[test]
    fn serde_rejects_invalid() {
        let result: Result<ToolName, _> = serde_json::from_str("\"Bad Name\"");
        assert!(result.is_err());
    }
}
