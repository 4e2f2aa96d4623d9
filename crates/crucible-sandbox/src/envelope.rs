//! The tool wire protocol: stdin carries the request, stdout carries a
//! single JSON envelope (§4.1 step 6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What gets written to the container's stdin: the caller's input plus a
/// `_context` block the tool may use for correlation, never for
/// authorization (access control is enforced before the container starts).
#[derive(Debug, Clone, Serialize)]
pub struct StdinEnvelope {
    pub input: Value,
}

impl StdinEnvelope {
    #[must_use]
    pub fn new(mut input: Value, context: Value) -> Self {
        if let Value::Object(ref mut map) = input {
            map.insert("_context".to_string(), context);
        }
        Self { input }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// A tool-reported error, as opposed to an infrastructure failure
/// synthesized by the Sandbox Executor itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

/// The parsed form of `{"ok": true, "output": ...}` or `{"ok": false,
/// "error": {...}}` (§4.1 step 6).
#[derive(Debug, Clone, Deserialize)]
pub struct StdoutEnvelope {
    pub ok: bool,
    pub output: Option<Value>,
    pub error: Option<ToolError>,
}

/// Parse raw stdout bytes as a single JSON envelope. A malformed or
/// missing envelope is the caller's responsibility to turn into a fatal
/// runtime error (§4.1: "synthesize a non-retryable runtime error with
/// message 'malformed tool output'").
pub fn parse_envelope(stdout: &[u8]) -> Result<StdoutEnvelope, serde_json::Error> {
    serde_json::from_slice(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stdin_envelope_merges_context_into_object_input() {
        let envelope = StdinEnvelope::new(json!({"a": 1}), json!({"trace_id": "abc"}));
        assert_eq!(envelope.input["a"], 1);
        assert_eq!(envelope.input["_context"]["trace_id"], "abc");
    }

    #[test]
    fn ok_envelope_parses() {
        let raw = br#"{"ok":true,"output":{"x":1}}"#;
        let parsed = parse_envelope(raw).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.output.unwrap()["x"], 1);
    }

    #[test]
    fn error_envelope_parses_retryable_flag() {
        let raw = br#"{"ok":false,"error":{"type":"upstream_timeout","message":"boom","retryable":true}}"#;
        let parsed = parse_envelope(raw).unwrap();
        assert!(!parsed.ok);
        assert!(parsed.error.unwrap().retryable);
    }

    #[test]
    fn malformed_stdout_fails_to_parse() {
        assert!(parse_envelope(b"not json").is_err());
    }

    #[test]
    fn missing_retryable_defaults_to_false() {
        let raw = br#"{"ok":false,"error":{"type":"x","message":"y"}}"#;
        let parsed = parse_envelope(raw).unwrap();
        assert!(!parsed.error.unwrap().retryable);
    }
}
