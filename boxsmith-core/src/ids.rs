use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A catalog identifier (a TMDb movie or collection id).
///
/// Sources disagree on formatting: Jellyfin stores provider ids as strings,
/// TMDb returns numbers, and hand-edited snapshot files contain both. All of
/// them are coerced into a `u64` here so lookups and set comparisons never
/// miss on `"603"` vs `603`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExternalId(u64);

/// Error returned when a value cannot be coerced into an [`ExternalId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid external id: {0:?}")]
pub struct InvalidExternalId(pub String);

impl ExternalId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Coerce a loosely typed JSON value (number or numeric string).
    ///
    /// Returns `None` for zero, negatives, fractions, and non-numeric text.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    return (v > 0).then_some(Self(v));
                }
                let f = n.as_f64()?;
                if f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
                    Some(Self(f as u64))
                } else {
                    None
                }
            }
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for ExternalId {
    type Err = InvalidExternalId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        match digits.parse::<u64>() {
            Ok(0) | Err(_) => Err(InvalidExternalId(s.to_string())),
            Ok(v) => Ok(Self(v)),
        }
    }
}

impl From<u64> for ExternalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ExternalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ExternalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid external id: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_accepts_float_suffix() {
        assert_eq!(" 603 ".parse::<ExternalId>(), Ok(ExternalId::new(603)));
        assert_eq!("603.0".parse::<ExternalId>(), Ok(ExternalId::new(603)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<ExternalId>().is_err());
        assert!("0".parse::<ExternalId>().is_err());
        assert!("tt0133093".parse::<ExternalId>().is_err());
        assert!("-5".parse::<ExternalId>().is_err());
    }

    #[test]
    fn test_from_json_number_and_string() {
        assert_eq!(
            ExternalId::from_json(&serde_json::json!(10)),
            Some(ExternalId::new(10))
        );
        assert_eq!(
            ExternalId::from_json(&serde_json::json!("10")),
            Some(ExternalId::new(10))
        );
        assert_eq!(
            ExternalId::from_json(&serde_json::json!(10.0)),
            Some(ExternalId::new(10))
        );
        assert_eq!(ExternalId::from_json(&serde_json::json!(10.5)), None);
        assert_eq!(ExternalId::from_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_deserialize_mixed_formats() {
        let ids: Vec<ExternalId> = serde_json::from_str(r#"[1, "2", " 3 "]"#).unwrap();
        assert_eq!(
            ids,
            vec![ExternalId::new(1), ExternalId::new(2), ExternalId::new(3)]
        );
    }
}
