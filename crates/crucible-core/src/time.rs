//! Time helpers shared across Crucible crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Returns the current wall-clock time.
///
/// Centralized so that a future deterministic-clock test seam only needs to
/// change this one function.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Serde helper for `Duration` serialized as whole milliseconds.
pub mod millis {
    use super::{Deserialize, Deserializer, Duration, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

/// Serde helper for `Option<Duration>` serialized as an optional integer of
/// milliseconds.
pub mod millis_opt {
    use super::{Deserialize, Deserializer, Duration, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => (d.as_millis() as u64).serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let opt: Option<u64> = Option::deserialize(d)?;
        Ok(opt.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "millis")]
        d: Duration,
    }

    #[test]
    fn millis_roundtrip() {
        let w = Wrapper {
            d: Duration::from_millis(1500),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"d":1500}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.d, Duration::from_millis(1500));
    }

    #[test]
    fn now_is_monotonic_enough_for_ordering() {
        let a = now();
        let b = now();
        assert!(b >= a);
    }
}
