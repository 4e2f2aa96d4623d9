//! Kubernetes-style resource quantity parsing (`"500m"` CPU, `"512Mi"` memory).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A CPU quantity, stored internally as nanocores (1 core = 1_000_000_000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpu {
    nanocores: u64,
}

impl Cpu {
    #[must_use]
    pub fn nanocores(self) -> u64 {
        self.nanocores
    }

    #[must_use]
    pub fn cores(self) -> f64 {
        self.nanocores as f64 / 1_000_000_000.0
    }

    pub fn parse(raw: &str) -> Result<Self, QuantityError> {
        let raw = raw.trim();
        if let Some(milli) = raw.strip_suffix('m') {
            let millicores: u64 = milli
                .parse()
                .map_err(|_| QuantityError::malformed(raw, "cpu"))?;
            Ok(Self { nanocores: millicores * 1_000_000 })
        } else {
            let cores: f64 = raw.parse().map_err(|_| QuantityError::malformed(raw, "cpu"))?;
            if cores < 0.0 {
                return Err(QuantityError::malformed(raw, "cpu"));
            }
            Ok(Self { nanocores: (cores * 1_000_000_000.0).round() as u64 })
        }
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanocores % 1_000_000 == 0 && self.nanocores < 1_000_000_000 {
            write!(f, "{}m", self.nanocores / 1_000_000)
        } else {
            write!(f, "{}", self.cores())
        }
    }
}

impl TryFrom<String> for Cpu {
    type Error = QuantityError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpu> for String {
    fn from(value: Cpu) -> Self {
        value.to_string()
    }
}

/// A memory quantity, stored internally as bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Memory {
    bytes: u64,
}

impl Memory {
    #[must_use]
    pub fn bytes(self) -> u64 {
        self.bytes
    }

    pub fn parse(raw: &str) -> Result<Self, QuantityError> {
        const UNITS: &[(&str, u64)] = &[
            ("Ki", 1024),
            ("Mi", 1024 * 1024),
            ("Gi", 1024 * 1024 * 1024),
            ("K", 1000),
            ("M", 1_000_000),
            ("G", 1_000_000_000),
        ];
        let raw = raw.trim();
        for (suffix, multiplier) in UNITS {
            if let Some(num) = raw.strip_suffix(suffix) {
                let value: u64 = num
                    .parse()
                    .map_err(|_| QuantityError::malformed(raw, "memory"))?;
                return Ok(Self { bytes: value * multiplier });
            }
        }
        let bytes: u64 = raw.parse().map_err(|_| QuantityError::malformed(raw, "memory"))?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes % (1024 * 1024) == 0 {
            write!(f, "{}Mi", self.bytes / (1024 * 1024))
        } else {
            write!(f, "{}", self.bytes)
        }
    }
}

impl TryFrom<String> for Memory {
    type Error = QuantityError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Memory> for String {
    fn from(value: Memory) -> Self {
        value.to_string()
    }
}

/// A resource quantity string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {kind} quantity: {raw:?}")]
pub struct QuantityError {
    raw: String,
    kind: &'static str,
}

impl QuantityError {
    fn malformed(raw: &str, kind: &'static str) -> Self {
        Self { raw: raw.to_string(), kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("500m", 500_000_000)]
    #[case("1500m", 1_500_000_000)]
    #[case("2", 2_000_000_000)]
    #[case("0.5", 500_000_000)]
    fn parses_cpu_quantities(#[case] raw: &str, #[case] nanocores: u64) {
        assert_eq!(Cpu::parse(raw).unwrap().nanocores(), nanocores);
    }

    #[rstest]
    #[case("512Mi", 512 * 1024 * 1024)]
    #[case("1Gi", 1024 * 1024 * 1024)]
    #[case("128Mi", 128 * 1024 * 1024)]
    #[case("1048576", 1_048_576)]
    fn parses_memory_quantities(#[case] raw: &str, #[case] bytes: u64) {
        assert_eq!(Memory::parse(raw).unwrap().bytes(), bytes);
    }

    #[rstest]
    #[case("lots")]
    #[case("-1")]
    #[case("")]
    fn rejects_garbage_cpu(#[case] raw: &str) {
        assert!(Cpu::parse(raw).is_err());
    }

    #[rstest]
    #[case("big")]
    #[case("-1Mi")]
    #[case("")]
    fn rejects_garbage_memory(#[case] raw: &str) {
        assert!(Memory::parse(raw).is_err());
    }

    #[test]
    fn cpu_display_roundtrips_millicores() {
        let cpu = Cpu::parse("500m").unwrap();
        assert_eq!(cpu.to_string(), "500m");
    }

    #[test]
    fn memory_display_roundtrips_mebibytes() {
        let mem = Memory::parse("512Mi").unwrap();
        assert_eq!(mem.to_string(), "512Mi");
    }
}
