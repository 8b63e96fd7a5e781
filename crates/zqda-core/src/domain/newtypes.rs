//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers used throughout the mirror.
//! Each newtype ensures data validity at construction time.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::DomainError;

// ============================================================================
// LibraryId
// ============================================================================

/// Numeric identifier of a remote group library
///
/// Deserializes from either a number or a numeric string, so the same type
/// works as a YAML map key (`4711671:`) and as a JSON object key
/// (`"4711671"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LibraryId(u64);

impl LibraryId {
    /// Create a LibraryId from its numeric value
    ///
    /// # Errors
    /// Returns error if the value is zero
    pub fn new(id: u64) -> Result<Self, DomainError> {
        if id == 0 {
            return Err(DomainError::InvalidLibraryId(
                "Library ID must be greater than 0".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the numeric value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for LibraryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LibraryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<u64>()
            .map_err(|_| DomainError::InvalidLibraryId(s.to_string()))?;
        Self::new(id)
    }
}

impl TryFrom<u64> for LibraryId {
    type Error = DomainError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for LibraryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::new(n).map_err(serde::de::Error::custom),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// RecordKey
// ============================================================================

/// Key of a remote object (item, attachment, note, annotation or collection)
///
/// Keys are opaque ASCII alphanumeric strings assigned by the remote service
/// and never change for the lifetime of the object. Rejecting anything else
/// keeps keys safe to use as directory names for attachment storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a new RecordKey
    ///
    /// # Errors
    /// Returns error if the key is empty or contains non-alphanumeric characters
    pub fn new(key: String) -> Result<Self, DomainError> {
        if key.is_empty() {
            return Err(DomainError::InvalidRecordKey(
                "Record key cannot be empty".to_string(),
            ));
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidRecordKey(key));
        }
        Ok(Self(key))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RecordKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.0
    }
}

impl Borrow<str> for RecordKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_id_rejects_zero() {
        assert!(LibraryId::new(0).is_err());
        assert_eq!(LibraryId::new(4711671).unwrap().as_u64(), 4711671);
    }

    #[test]
    fn test_library_id_from_str() {
        let id: LibraryId = "4711671".parse().unwrap();
        assert_eq!(id.as_u64(), 4711671);
        assert_eq!(id.to_string(), "4711671");

        assert!("group".parse::<LibraryId>().is_err());
        assert!("".parse::<LibraryId>().is_err());
    }

    #[test]
    fn test_library_id_deserializes_number_or_string() {
        let from_number: LibraryId = serde_json::from_str("42").unwrap();
        let from_string: LibraryId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_library_id_as_json_map_key() {
        let json = r#"{"42": 7, "1001": 3}"#;
        let map: std::collections::BTreeMap<LibraryId, u64> = serde_json::from_str(json).unwrap();
        assert_eq!(map[&LibraryId::new(42).unwrap()], 7);

        let back = serde_json::to_string(&map).unwrap();
        assert_eq!(back, r#"{"42":7,"1001":3}"#);
    }

    #[test]
    fn test_record_key_validation() {
        assert!(RecordKey::new("UJ8WGSFR".to_string()).is_ok());
        assert!(RecordKey::new(String::new()).is_err());
        assert!(RecordKey::new("../etc".to_string()).is_err());
        assert!(RecordKey::new("AB CD".to_string()).is_err());
    }

    #[test]
    fn test_record_key_serde_round_trip_rejects_invalid() {
        let key: RecordKey = serde_json::from_str("\"GXPF7VK9\"").unwrap();
        assert_eq!(key.as_str(), "GXPF7VK9");

        let bad: Result<RecordKey, _> = serde_json::from_str("\"a/b\"");
        assert!(bad.is_err());
    }
}
