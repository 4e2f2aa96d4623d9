//! Unique identifiers for Crucible entities.
//!
//! Strongly-typed UUID identifiers built on [`domain-key`](https://crates.io/crates/domain-key)
//! `Uuid<D>` wrappers. Each identifier type is parameterized by a unique
//! domain marker, so an `ExecutionId` and a `ToolVersionId` cannot be
//! confused for one another at compile time even though both wrap a UUID.
//!
//! All ID types are `Copy` (16 bytes, stack-allocated) and support:
//! - `v4()` for random UUID generation
//! - `nil()` for a zero-valued default
//! - `parse(&str)` for string parsing
//! - Full serde support (serializes as a UUID string)
//! - `Display`, `FromStr`, `Eq`, `Ord`, `Hash`

use domain_key::define_uuid;

pub use domain_key::UuidParseError;

// Entity identifiers — UUID-based, Copy, 16 bytes each.
define_uuid!(pub ExecutionIdDomain => ExecutionId);
define_uuid!(pub ToolVersionIdDomain => ToolVersionId);
define_uuid!(pub RunIdDomain => RunId);
define_uuid!(pub AgentIdDomain => AgentId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_v4_creates_non_nil_uuid() {
        let id = ExecutionId::v4();
        assert!(!id.is_nil());
    }

    #[test]
    fn id_nil_creates_zero_valued_uuid() {
        let id = ToolVersionId::nil();
        assert!(id.is_nil());
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn id_parse_invalid_string_returns_error() {
        assert!(ExecutionId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn id_copy_semantics_both_copies_usable() {
        let a = RunId::v4();
        let b = a;
        assert_eq!(a, b);
    }

    #[test]
    fn id_serde_json_roundtrip() {
        let id = AgentId::v4();
        let json = serde_json::to_string(&id).unwrap();
        let back: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn different_id_types_are_incompatible() {
        fn accepts_execution(_id: ExecutionId) {}
        fn accepts_run(_id: RunId) {}

        accepts_execution(ExecutionId::v4());
        accepts_run(RunId::v4());
        // accepts_execution(RunId::v4()); // would not compile
    }
}
