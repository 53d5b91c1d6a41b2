//! Entity identity system using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Prefix shared by every human-readable lot code
pub const LOT_CODE_PREFIX: &str = "LOTE-";

/// Entity type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Part type (tolerance template)
    Pt,
    /// Production lot under inspection
    Lot,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Pt => "PT",
            EntityPrefix::Lot => "LOT",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[EntityPrefix::Pt, EntityPrefix::Lot]
    }

    /// Directory (relative to the project root) holding entities of this type
    pub fn directory(&self) -> &'static str {
        match self {
            EntityPrefix::Pt => "part-types",
            EntityPrefix::Lot => "lots",
        }
    }

    /// Human-readable entity name used in messages
    pub fn entity_name(&self) -> &'static str {
        match self {
            EntityPrefix::Pt => "part type",
            EntityPrefix::Lot => "lot",
        }
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PT" => Ok(EntityPrefix::Pt),
            "LOT" => Ok(EntityPrefix::Lot),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique entity identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId with the given prefix
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    /// Create an EntityId from a prefix and existing ULID
    pub fn from_parts(prefix: EntityPrefix, ulid: Ulid) -> Self {
        Self { prefix, ulid }
    }

    /// Get the entity prefix
    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    /// Get the ULID component
    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Build a lot code from an epoch-millisecond value.
///
/// Only the last six decimal digits are kept, so two lots created exactly
/// one million milliseconds apart map to the same code. Callers that need
/// uniqueness must check the store and retry with [`next_lot_code_seed`].
pub fn lot_code_from_millis(millis: i64) -> String {
    let digits = millis.rem_euclid(1_000_000);
    format!("{}{:06}", LOT_CODE_PREFIX, digits)
}

/// Seed for the next candidate code after a collision
pub fn next_lot_code_seed(millis: i64) -> i64 {
    millis.wrapping_add(1)
}

/// Check whether a reference looks like a lot code (LOTE-NNNNNN)
pub fn is_lot_code(reference: &str) -> bool {
    reference
        .strip_prefix(LOT_CODE_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Errors that can occur when parsing entity IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid entity prefix: '{0}' (valid: PT, LOT)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in entity ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}
