//! Shared value types: identifiers and money.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a customer session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random `SessionId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SessionId` from a `Uuid`
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

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bay number, unique within the facility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BayId(u32);

impl BayId {
    /// Creates a `BayId` from its number
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// The bay number
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bay-{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Money amount in cents (to avoid floating point issues)
///
/// Percentage operations round half-up to the nearest cent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero dollars
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars, saturating on overflow
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Dollars as a float, for display and approximate comparisons
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_dollars_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts, stopping at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies by a whole quantity (hours, players), saturating on overflow
    #[must_use]
    pub const fn times(self, quantity: u64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// `percent`% of this amount, rounded half-up. Percentages above 100 are capped.
    #[must_use]
    pub const fn percent_of(self, percent: u8) -> Self {
        let percent = if percent > 100 { 100 } else { percent as u64 };
        Self((self.0.saturating_mul(percent).saturating_add(50)) / 100)
    }

    /// This amount with `percent`% taken off, rounded half-up
    #[must_use]
    pub const fn apply_percent_off(self, percent: u8) -> Self {
        let kept = if percent > 100 { 0 } else { 100 - percent };
        self.percent_of(kept)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}
