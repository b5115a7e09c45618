//! Fixed-point credit amounts.
//!
//! The ledger's unit of account is the "credit". Amounts are non-negative
//! and need fractional precision (resource sizes are given in GB, often
//! < 1, and the miner fee is 0.1% of a transaction's value), but comparing
//! raw `f64` balances for "is the sender's balance sufficient" is the kind
//! of thing that quietly breaks on accumulated rounding error. `Credits`
//! stores the amount as whole micro-credits (1 credit = 1_000_000 micros)
//! so admission checks and balance replay use exact integer arithmetic.
//!
//! The canonical string form used by [`crate::transaction::Transaction`]'s
//! fingerprint is fixed at six decimal digits (`"10000.000000"`), which is
//! the same precision the micro-credit representation carries exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

const MICROS_PER_CREDIT: i64 = 1_000_000;

/// A non-negative amount of credit, represented as whole micro-credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credits(i64);

impl Credits {
    pub const ZERO: Credits = Credits(0);

    /// Builds a `Credits` value from a floating-point amount, rounding to
    /// the nearest micro-credit. Negative inputs are clamped to zero: the
    /// ledger has no notion of a negative credit movement.
    pub fn from_f64(value: f64) -> Self {
        let micros = (value.max(0.0) * MICROS_PER_CREDIT as f64).round() as i64;
        Credits(micros)
    }

    /// Builds a `Credits` value from a whole number of credits.
    pub fn from_whole(value: u64) -> Self {
        Credits(value as i64 * MICROS_PER_CREDIT)
    }

    /// Returns the amount as a floating-point number of credits, for
    /// callers (e.g. the HTTP layer this crate feeds) that want a plain
    /// number rather than the fixed-point representation.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_CREDIT as f64
    }

    /// Multiplies by a rational rate (e.g. the 0.1% fee rate), rounding to
    /// the nearest micro-credit.
    pub fn scaled(self, rate: f64) -> Credits {
        Credits(((self.0 as f64) * rate).round() as i64)
    }

    /// Canonical decimal string used inside transaction fingerprints.
    pub fn canonical(self) -> String {
        format!("{:.6}", self.as_f64())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Default for Credits {
    fn default() -> Self {
        Credits::ZERO
    }
}

impl Add for Credits {
    type Output = Credits;
    fn add(self, rhs: Self) -> Self::Output {
        Credits(self.0 + rhs.0)
    }
}

impl Sub for Credits {
    type Output = Credits;
    fn sub(self, rhs: Self) -> Self::Output {
        Credits(self.0 - rhs.0)
    }
}

impl Mul<u64> for Credits {
    type Output = Credits;
    fn mul(self, rhs: u64) -> Self::Output {
        Credits(self.0 * rhs as i64)
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Credits>>(iter: I) -> Self {
        iter.fold(Credits::ZERO, Add::add)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f64_rounds_to_micro_credit() {
        let c = Credits::from_f64(0.025 * 1000.0);
        assert_eq!(c.as_f64(), 25.0);
    }

    #[test]
    fn scaled_computes_fee() {
        let cost = Credits::from_whole(25);
        let fee = cost.scaled(0.001);
        assert_eq!(fee.as_f64(), 0.025);
    }

    #[test]
    fn negative_input_clamps_to_zero() {
        assert_eq!(Credits::from_f64(-5.0), Credits::ZERO);
    }

    #[test]
    fn canonical_is_fixed_precision() {
        assert_eq!(Credits::from_whole(10_000).canonical(), "10000.000000");
    }
}
