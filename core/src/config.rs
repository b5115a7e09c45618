//! Economic and consensus configuration for **Nexus** core.
//!
//! The [`Config`] struct centralises the tunable parameters of the credit
//! economy and the proof-of-work consensus: difficulty, reward schedule,
//! endowment, and pricing. It is constructed via the [`ConfigBuilder`] using
//! the fluent builder pattern, enabling callers to customise only the
//! fields they care about while keeping sensible defaults.
//!
//! All fields are `pub` so read-only access is ergonomic, however mutation
//! should occur through the builder to preserve validation invariants.
//!
//! ```
//! use nexus_core::config::Config;
//!
//! // default configuration, matching the worked examples in the design docs
//! let cfg = Config::default();
//! assert_eq!(cfg.difficulty, 2);
//! assert_eq!(cfg.base_reward, 50);
//! ```

use crate::amount::Credits;
use serde::{Deserialize, Serialize};

/// Runtime configuration shared across the crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// PoW difficulty: number of leading hex-zero characters a block hash
    /// must exhibit.
    pub difficulty: usize,

    /// Base mining reward paid to the miner of a block, before fees and
    /// before halving.
    pub base_reward: u64,

    /// Number of blocks between successive halvings of `base_reward`.
    pub halving_interval: u64,

    /// Credit granted to a newly registered user (spendable once a block
    /// confirms it).
    pub initial_credit: u64,

    /// Credit earned per gigabyte declared when publishing a resource, and
    /// charged per gigabyte when downloading one.
    pub credit_per_gb: u64,

    /// Fraction of an "economic" transaction's value (download, transfer)
    /// charged as a miner fee. Not debited a second time from the sender —
    /// see [`crate::chain::Chain::mine_pending`].
    pub fee_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: 2,
            base_reward: 50,
            halving_interval: 210_000,
            initial_credit: 10_000,
            credit_per_gb: 1_000,
            fee_rate: 0.001,
        }
    }
}

impl Config {
    /// Credit earned for declaring `size_gb` gigabytes of resources.
    pub fn declaration_credit(&self, size_gb: f64) -> Credits {
        Credits::from_f64(size_gb * self.credit_per_gb as f64)
    }

    /// Credit charged to download `size_gb` gigabytes of a resource.
    pub fn download_cost(&self, size_gb: f64) -> Credits {
        self.declaration_credit(size_gb)
    }

    /// Miner fee levied on a movement of `amount` credits.
    pub fn fee(&self, amount: Credits) -> Credits {
        amount.scaled(self.fee_rate)
    }
}

/// Fluent builder for [`Config`].
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// Starts a new builder pre-populated with [`Config::default`].
    pub fn new() -> Self {
        Self { inner: Config::default() }
    }

    pub fn difficulty(mut self, diff: usize) -> Self {
        self.inner.difficulty = diff;
        self
    }

    pub fn base_reward(mut self, reward: u64) -> Self {
        self.inner.base_reward = reward;
        self
    }

    pub fn halving_interval(mut self, blocks: u64) -> Self {
        self.inner.halving_interval = blocks;
        self
    }

    pub fn initial_credit(mut self, amount: u64) -> Self {
        self.inner.initial_credit = amount;
        self
    }

    pub fn credit_per_gb(mut self, amount: u64) -> Self {
        self.inner.credit_per_gb = amount;
        self
    }

    pub fn fee_rate(mut self, rate: f64) -> Self {
        self.inner.fee_rate = rate;
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> Config {
        self.inner
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .difficulty(4)
            .base_reward(25)
            .halving_interval(100)
            .finish();
        assert_eq!(cfg.difficulty, 4);
        assert_eq!(cfg.base_reward, 25);
        assert_eq!(cfg.halving_interval, 100);
    }

    #[test]
    fn default_reproduces_worked_example_literals() {
        let cfg = Config::default();
        assert_eq!(cfg.base_reward, 50);
        assert_eq!(cfg.initial_credit, 10_000);
        assert_eq!(cfg.credit_per_gb, 1_000);
        assert_eq!(cfg.fee_rate, 0.001);
    }
}
