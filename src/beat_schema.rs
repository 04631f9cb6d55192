//! # Beat Schemas
//!
//! A beat schema describes how the beats of a measure are grouped, and therefore
//! how many chords the measure box is split into. It is written as positive
//! integers joined by `-`:
//!
//! ```text
//! "4"        one chord for the whole measure
//! "2-2"      two chords, two beats each
//! "2-1-1"    one chord for two beats, then two single-beat chords
//! "1-1-2"
//! "1-1-1-1"  four single-beat chords
//! ```
//!
//! The sum of the parts is the measure's total beat count.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Longest schema string accepted
pub const MAX_BEAT_SCHEMA_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BeatSchema {
    parts: Vec<u8>,
}

impl BeatSchema {
    pub fn parse(schema: &str) -> Result<Self, ChartError> {
        let invalid = |reason: &str| ChartError::InvalidBeatSchema {
            schema: schema.to_string(),
            reason: reason.to_string(),
        };

        if schema.is_empty() {
            return Err(invalid("empty schema"));
        }
        if schema.len() > MAX_BEAT_SCHEMA_LEN {
            return Err(invalid("longer than 13 characters"));
        }

        let parts = schema
            .split('-')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("expected numbers separated by '-'"));
                }
                match part.parse::<u8>() {
                    Ok(0) => Err(invalid("beat groups must be at least 1")),
                    Ok(beats) => Ok(beats),
                    Err(_) => Err(invalid("beat group too large")),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts })
    }

    /// One chord slot spanning `beats` beats, e.g. "3"
    pub fn single(beats: u8) -> Result<Self, ChartError> {
        Self::parse(&beats.to_string())
    }

    /// Beat groups, one per chord slot
    pub fn parts(&self) -> &[u8] {
        &self.parts
    }

    /// Total beats in the measure
    pub fn total(&self) -> u32 {
        self.parts.iter().map(|beats| *beats as u32).sum()
    }
}

impl Default for BeatSchema {
    fn default() -> Self {
        Self { parts: vec![4] }
    }
}

impl fmt::Display for BeatSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.parts.iter().map(|beats| beats.to_string()).collect();
        write!(f, "{}", joined.join("-"))
    }
}

impl FromStr for BeatSchema {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BeatSchema {
    type Error = ChartError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BeatSchema> for String {
    fn from(schema: BeatSchema) -> String {
        schema.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_schemas() {
        for schema in ["4", "2-2", "2-1-1", "1-1-2", "1-1-1-1", "3", "3-3"] {
            let parsed = BeatSchema::parse(schema).unwrap();
            assert_eq!(parsed.to_string(), schema);
        }
        assert_eq!(BeatSchema::parse("2-1-1").unwrap().total(), 4);
        assert_eq!(BeatSchema::parse("2-1-1").unwrap().parts(), &[2, 1, 1]);
    }

    #[test]
    fn test_single_slot() {
        assert_eq!(BeatSchema::single(3).unwrap().to_string(), "3");
        assert_eq!(BeatSchema::single(3).unwrap().parts(), &[3]);
        assert!(BeatSchema::single(0).is_err());
    }

    #[test]
    fn test_default_is_four() {
        assert_eq!(BeatSchema::default().to_string(), "4");
        assert_eq!(BeatSchema::default().total(), 4);
    }

    #[test]
    fn test_invalid_schemas() {
        for schema in ["", "0", "2--2", "a-b", "2-2-", "1-1-1-1-1-1-1-1", "+2-+2", "+4", " 4", "300"] {
            let err = BeatSchema::parse(schema).unwrap_err();
            assert!(
                matches!(err, ChartError::InvalidBeatSchema { .. }),
                "{:?} should be rejected",
                schema
            );
        }
    }
}
