#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Schema
//!
//! Compiles manifest input/output JSON schemas into `jsonschema::Validator`s
//! and caches the compiled form, since compilation is the expensive part of
//! validating against the same manifest repeatedly (spec.md §4.5).

use crucible_core::ToolVersionId;
use crucible_error::{Error, Violation};
use moka::sync::Cache;
use std::sync::Arc;

/// Which side of the tool boundary a schema validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The request body sent to the tool.
    Input,
    /// The envelope the tool returned.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    tool_version_id: ToolVersionId,
    direction: Direction,
}

/// Compiles and caches JSON-Schema (draft-07) validators keyed by
/// `(tool version, direction)`.
///
/// Grounded on the teacher's `Cached` validation combinator: a
/// `moka::sync::Cache` in front of an expensive, otherwise-repeated
/// computation.
pub struct SchemaCache {
    compiled: Cache<CacheKey, Arc<jsonschema::Validator>>,
}

impl SchemaCache {
    /// Build a cache with the given entry capacity.
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            compiled: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Validate `document` against `schema`, compiling and caching the
    /// validator under `(tool_version_id, direction)` on first use.
    ///
    /// Returns every violation found, not just the first, per the
    /// structured-error requirement for validation failures.
    pub fn validate(
        &self,
        tool_version_id: ToolVersionId,
        direction: Direction,
        schema: &serde_json::Value,
        document: &serde_json::Value,
    ) -> Result<(), Error> {
        let key = CacheKey { tool_version_id, direction };
        let validator = match self.compiled.get(&key) {
            Some(validator) => validator,
            None => {
                let compiled = jsonschema::options()
                    .with_draft(jsonschema::Draft::Draft7)
                    .build(schema)
                    .map_err(|e| {
                        Error::validation_msg(format!("manifest schema does not compile: {e}"))
                    })?;
                let validator = Arc::new(compiled);
                self.compiled.insert(key, Arc::clone(&validator));
                validator
            }
        };

        let violations: Vec<Violation> = validator
            .iter_errors(document)
            .map(|e| Violation {
                path: e.instance_path.to_string(),
                message: e.to_string(),
                violated_rule: e.schema_path.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(violations))
        }
    }

    /// Drop the compiled validator for one `(tool, direction)` pair, e.g.
    /// after a manifest is re-published under the same version during
    /// development.
    pub fn invalidate(&self, tool_version_id: ToolVersionId, direction: Direction) {
        self.compiled.invalidate(&CacheKey { tool_version_id, direction });
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::with_capacity(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        })
    }

    #[test]
    fn valid_document_passes() {
        let cache = SchemaCache::default();
        let id = ToolVersionId::v4();
        let result = cache.validate(id, Direction::Input, &schema(), &json!({"name": "x"}));
        assert!(result.is_ok());
    }

    #[test]
    fn invalid_document_collects_all_violations() {
        let cache = SchemaCache::default();
        let id = ToolVersionId::v4();
        let result = cache.validate(id, Direction::Input, &schema(), &json!({}));
        let err = result.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.wire_type(), "validation");
    }

    #[test]
    fn input_and_output_cache_independently() {
        let cache = SchemaCache::default();
        let id = ToolVersionId::v4();
        let out_schema = json!({"type": "object", "required": ["result"]});
        assert!(cache.validate(id, Direction::Input, &schema(), &json!({"name": "x"})).is_ok());
        assert!(cache.validate(id, Direction::Output, &out_schema, &json!({})).is_err());
    }

    #[test]
    fn compiling_an_invalid_schema_is_a_validation_error() {
        let cache = SchemaCache::default();
        let id = ToolVersionId::v4();
        let broken = json!({"type": "not-a-real-type"});
        let result = cache.validate(id, Direction::Input, &broken, &json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn invalidate_forces_recompilation() {
        let cache = SchemaCache::default();
        let id = ToolVersionId::v4();
        cache.validate(id, Direction::Input, &schema(), &json!({"name": "x"})).unwrap();
        cache.invalidate(id, Direction::Input);
        assert!(cache.validate(id, Direction::Input, &schema(), &json!({"name": "y"})).is_ok());
    }

    #[rstest::rstest]
    #[case(json!({"name": "x", "count": 1}), true)]
    #[case(json!({"name": "x", "count": -1}), false)]
    #[case(json!({"count": 1}), false)]
    #[case(json!({"name": 7, "count": 1}), false)]
    #[case(json!({"name": "x", "count": 1, "extra": true}), true)]
    fn documents_are_accepted_or_rejected_per_schema(#[case] document: serde_json::Value, #[case] valid: bool) {
        let schema = json!({
            "type": "object",
            "required": ["name", "count"],
            "properties": {
                "name": { "type": "string" },
                "count": { "type": "integer", "minimum": 0 }
            }
        });
        let cache = SchemaCache::default();
        let result = cache.validate(ToolVersionId::v4(), Direction::Input, &schema, &document);
        assert_eq!(result.is_ok(), valid, "document {document} validity mismatch");
    }
}
