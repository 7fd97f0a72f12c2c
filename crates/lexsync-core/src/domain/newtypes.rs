//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

/// Identifier for cached case records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random RecordId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RecordId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid RecordId: {e}")))
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier for pending changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(Uuid);

impl ChangeId {
    /// Create a new random ChangeId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a ChangeId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ChangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangeId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid ChangeId: {e}")))
    }
}

impl From<Uuid> for ChangeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// CaseNumber
// ============================================================================

/// Maximum accepted length of a case number
const MAX_CASE_NUMBER_LEN: usize = 64;

/// Court case number, e.g. "CIV/2024/0113"
///
/// Stored trimmed. Must be non-empty, at most 64 characters, and contain
/// only alphanumerics and the separators `/ - . _` or spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseNumber(String);

impl CaseNumber {
    /// Create a new CaseNumber
    ///
    /// # Errors
    /// Returns error if the number is empty, too long, or contains invalid characters
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidCaseNumber(
                "Case number cannot be empty".to_string(),
            ));
        }

        if trimmed.len() > MAX_CASE_NUMBER_LEN {
            return Err(DomainError::InvalidCaseNumber(format!(
                "Case number exceeds {MAX_CASE_NUMBER_LEN} characters"
            )));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '.' | '_' | ' '))
        {
            return Err(DomainError::InvalidCaseNumber(format!(
                "Case number contains invalid characters: {trimmed}"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CaseNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CaseNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CaseNumber {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CaseNumber> for String {
    fn from(n: CaseNumber) -> Self {
        n.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod record_id_tests {
        use super::*;

        #[test]
        fn test_new_creates_unique_ids() {
            let id1 = RecordId::new();
            let id2 = RecordId::new();
            assert_ne!(id1, id2);
        }

        #[test]
        fn test_from_str() {
            let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
            let id: RecordId = uuid_str.parse().unwrap();
            assert_eq!(id.to_string(), uuid_str);
        }

        #[test]
        fn test_from_str_invalid() {
            let result: Result<RecordId, _> = "not-a-uuid".parse();
            assert!(matches!(result, Err(DomainError::InvalidId(_))));
        }

        #[test]
        fn test_serializes_as_plain_string() {
            let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
            let id = RecordId::from_uuid(uuid);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
        }
    }

    mod change_id_tests {
        use super::*;

        #[test]
        fn test_new_creates_unique_ids() {
            assert_ne!(ChangeId::new(), ChangeId::new());
        }

        #[test]
        fn test_from_uuid() {
            let uuid = Uuid::new_v4();
            let id = ChangeId::from_uuid(uuid);
            assert_eq!(id.as_uuid(), &uuid);
        }
    }

    mod case_number_tests {
        use super::*;

        #[test]
        fn test_valid_case_numbers() {
            assert!(CaseNumber::new("CIV/2024/0113").is_ok());
            assert!(CaseNumber::new("HC-17.2023_b").is_ok());
            assert!(CaseNumber::new("Suit No 44 of 2022").is_ok());
        }

        #[test]
        fn test_trims_whitespace() {
            let n = CaseNumber::new("  CR/9/2021 ").unwrap();
            assert_eq!(n.as_str(), "CR/9/2021");
        }

        #[test]
        fn test_rejects_empty() {
            assert!(CaseNumber::new("").is_err());
            assert!(CaseNumber::new("   ").is_err());
        }

        #[test]
        fn test_rejects_invalid_characters() {
            assert!(CaseNumber::new("CIV;DROP").is_err());
            assert!(CaseNumber::new("A<B>").is_err());
        }

        #[test]
        fn test_rejects_too_long() {
            let long = "A".repeat(MAX_CASE_NUMBER_LEN + 1);
            assert!(CaseNumber::new(long).is_err());
        }

        #[test]
        fn test_deserialize_validates() {
            let ok: Result<CaseNumber, _> = serde_json::from_str("\"CIV/1\"");
            assert!(ok.is_ok());
            let bad: Result<CaseNumber, _> = serde_json::from_str("\"\"");
            assert!(bad.is_err());
        }
    }
}
