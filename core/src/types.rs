//! Value objects and identifiers for the portal domain.
//!
//! All identifiers are newtypes over `Uuid`; ledger-facing values
//! (`WalletAddress`, `TxHash`) are validated hex strings normalized to
//! lowercase at the boundary so equality and unique constraints behave the
//! same on-chain and off-chain.

use crate::error::{PortalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a participant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Creates a new random `ParticipantId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ParticipantId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a cake submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CakeId(Uuid);

impl CakeId {
    /// Creates a new random `CakeId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CakeId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ledger-facing values
// ============================================================================

/// A 20-byte hex wallet address, normalized to lowercase.
///
/// The address is immutable once bound to a participant; lowercase
/// normalization at construction time means string equality is address
/// equality everywhere downstream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize a wallet address (`0x` + 40 hex digits).
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidAddress`] if the input is not a
    /// `0x`-prefixed 20-byte hex string.
    pub fn parse(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let hex = lower
            .strip_prefix("0x")
            .ok_or_else(|| PortalError::InvalidAddress(s.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PortalError::InvalidAddress(s.to_string()));
        }
        Ok(Self(lower))
    }

    /// The normalized `0x...` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 32-byte hex transaction hash, normalized to lowercase.
///
/// The idempotency key for the whole reconciliation protocol: a confirmed
/// ledger transaction is applied to the store at most once per hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    /// Parse and normalize a transaction hash (`0x` + 64 hex digits).
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidTxHash`] if the input is not a
    /// `0x`-prefixed 32-byte hex string.
    pub fn parse(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let hex = lower
            .strip_prefix("0x")
            .ok_or_else(|| PortalError::InvalidTxHash(s.to_string()))?;
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PortalError::InvalidTxHash(s.to_string()));
        }
        Ok(Self(lower))
    }

    /// The normalized `0x...` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Voting category
// ============================================================================

/// A voting category.
///
/// Closed set, not extensible at runtime. Every participant must vote in
/// every category before checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Most beautiful cake
    Beautiful,
    /// Most delicious cake
    Delicious,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 2] = [Self::Beautiful, Self::Delicious];

    /// Convert category to its wire/database string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beautiful => "beautiful",
            Self::Delicious => "delicious",
        }
    }

    /// Parse category from its wire/database string.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidCategory`] for anything outside the
    /// closed set.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "beautiful" => Ok(Self::Beautiful),
            "delicious" => Ok(Self::Delicious),
            _ => Err(PortalError::InvalidCategory(s.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Seat
// ============================================================================

/// A (table, seat) pair identifying one physical spot a cake occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seat {
    /// Table number (1-based)
    pub table: i16,
    /// Seat number within the table (1-based)
    pub seat: i16,
}

impl Seat {
    /// Create a seat, validating both coordinates are positive.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::MalformedPayload`] if either coordinate is
    /// zero or negative.
    pub fn new(table: i16, seat: i16) -> Result<Self> {
        if table < 1 || seat < 1 {
            return Err(PortalError::MalformedPayload(format!(
                "seat coordinates must be positive, got table {table}, seat {seat}"
            )));
        }
        Ok(Self { table, seat })
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table {}, seat {}", self.table, self.seat)
    }
}

// ============================================================================
// Fee (wei-based to avoid floating point errors)
// ============================================================================

/// A registration fee in wei.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fee(u64);

impl Fee {
    /// Creates a `Fee` from wei
    #[must_use]
    pub const fn from_wei(wei: u64) -> Self {
        Self(wei)
    }

    /// Returns the amount in wei
    #[must_use]
    pub const fn wei(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wallet_address_normalizes_to_lowercase() {
        let addr = WalletAddress::parse("0xAbCdEf0123456789aBcDeF0123456789abcdef01").unwrap();
        assert_eq!(addr.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn wallet_address_rejects_bad_input() {
        assert!(WalletAddress::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(WalletAddress::parse("0x1234").is_err());
        assert!(WalletAddress::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn tx_hash_normalizes_and_validates() {
        let hash = TxHash::parse(&format!("0x{}", "AB".repeat(32))).unwrap();
        assert_eq!(hash.as_str(), format!("0x{}", "ab".repeat(32)));
        assert!(TxHash::parse("0xabc").is_err());
    }

    #[test]
    fn category_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()).unwrap(), category);
        }
        assert!(Category::parse("tastiest").is_err());
    }

    #[test]
    fn seat_rejects_non_positive_coordinates() {
        assert!(Seat::new(0, 1).is_err());
        assert!(Seat::new(3, -2).is_err());
        assert_eq!(Seat::new(3, 2).unwrap().to_string(), "table 3, seat 2");
    }
}
