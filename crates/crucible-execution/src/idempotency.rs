//! Canonical input hashing for the idempotence cache (§3, §4.2).

use crucible_core::{canonicalize, ExecutionId, ToolName, ToolVersionId};
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// sha-256 over the canonical JSON encoding of `{tool, version, input}`.
///
/// Two calls with semantically-equivalent `input` documents (differing
/// only by object key order or whitespace) produce the same hash — this is
/// the canonicalization law the idempotence cache relies on (P2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputHash([u8; 32]);

impl InputHash {
    /// Compute the canonical input hash for one execution request.
    #[must_use]
    pub fn compute(tool: &ToolName, version: &Version, input: &serde_json::Value) -> Self {
        let envelope = serde_json::json!({
            "tool": tool.as_str(),
            "version": version.to_string(),
            "input": input,
        });
        let bytes = canonicalize(&envelope);
        let digest = Sha256::digest(&bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for InputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The `(tool_version_id, input_hash)` compound key that uniquely
/// identifies a cache slot (§3 invariant 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub tool_version_id: ToolVersionId,
    pub input_hash: InputHash,
}

impl CacheKey {
    #[must_use]
    pub fn new(tool_version_id: ToolVersionId, input_hash: InputHash) -> Self {
        Self { tool_version_id, input_hash }
    }
}

/// A cache slot value: the id of the prior succeeded execution plus hit
/// accounting (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheEntry {
    pub execution_id: ExecutionId,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub hit_count: u64,
}

impl CacheEntry {
    #[must_use]
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn tool() -> ToolName {
        ToolName::parse("t.echo").unwrap()
    }

    fn version() -> Version {
        Version::parse("1.0.0").unwrap()
    }

    #[test]
    fn same_input_same_hash() {
        let a = InputHash::compute(&tool(), &version(), &json!({"in": "hi"}));
        let b = InputHash::compute(&tool(), &version(), &json!({"in": "hi"}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = InputHash::compute(&tool(), &version(), &json!({"a": 1, "b": 2}));
        let b = InputHash::compute(&tool(), &version(), &json!({"b": 2, "a": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn different_input_different_hash() {
        let a = InputHash::compute(&tool(), &version(), &json!({"in": "hi"}));
        let b = InputHash::compute(&tool(), &version(), &json!({"in": "bye"}));
        assert_ne!(a, b);
    }

    #[test]
    fn different_version_different_hash() {
        let a = InputHash::compute(&tool(), &version(), &json!({"in": "hi"}));
        let b = InputHash::compute(&tool(), &Version::parse("2.0.0").unwrap(), &json!({"in": "hi"}));
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_hex() {
        let h = InputHash::compute(&tool(), &version(), &json!({}));
        assert_eq!(h.to_string().len(), 64);
        assert!(h.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn expiry_is_exclusive_of_expires_at() {
        let now = chrono::Utc::now();
        let entry = CacheEntry {
            execution_id: ExecutionId::v4(),
            expires_at: now - chrono::Duration::seconds(1),
            hit_count: 0,
        };
        assert!(entry.is_expired(now));
    }

    proptest! {
        #[test]
        fn permuted_object_keys_hash_identically(a in 0i64..1000, b in 0i64..1000) {
            let obj1 = json!({"a": a, "b": b});
            let obj2 = json!({"b": b, "a": a});
            prop_assert_eq!(
                InputHash::compute(&tool(), &version(), &obj1),
                InputHash::compute(&tool(), &version(), &obj2)
            );
        }
    }
}
