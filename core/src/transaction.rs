//! Transactions: immutable records of a credit movement.
//!
//! A transaction mints or moves [`Credits`] between two ledger identities,
//! optionally carrying a resource payload (the declared or traded file's
//! dictionary form). Once constructed a transaction never changes; its
//! [`Transaction::fingerprint`] is computed once and memoised.

use crate::amount::Credits;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// An opaque, canonically-ordered resource payload. Using a `BTreeMap`
/// rather than a `HashMap` makes lexicographic key order a structural
/// property of the type instead of a sort step callers must remember to
/// apply before hashing.
pub type ResourcePayload = BTreeMap<String, serde_json::Value>;

/// The kind of credit movement a transaction represents.
///
/// The kind tag is the sole discriminant for payload shape — Non-goal per
/// the design notes: resource payloads are not modelled as distinct
/// variants at the transaction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// The single transaction in the genesis block.
    Genesis,
    /// Initial endowment granted to a newly registered user.
    InitialCredit,
    /// Credit earned by declaring (publishing) a resource.
    ResourceDeclaration,
    /// Payment from a downloader to a resource's owner.
    ResourceDownload,
    /// Synthetic reward minted to a miner; always last in its block.
    MiningReward,
    /// A plain credit transfer between two identities.
    Transfer,
}

impl TxKind {
    /// Whether transactions of this kind contribute to the per-block miner
    /// fee (spec: "economic" transaction kinds).
    pub fn is_fee_bearing(self) -> bool {
        matches!(self, TxKind::ResourceDownload | TxKind::Transfer)
    }
}

/// An immutable record of a credit movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: Credits,
    pub kind: TxKind,
    #[serde(rename = "resource_data")]
    pub resource: ResourcePayload,
    pub timestamp: f64,
    fingerprint: String,
}

impl Transaction {
    /// Constructs a new transaction, timestamping it at the current wall
    /// clock and computing its fingerprint immediately. There are no
    /// mutators; once built a transaction is final.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Credits,
        kind: TxKind,
        resource: ResourcePayload,
    ) -> Self {
        let sender = sender.into();
        let receiver = receiver.into();
        let timestamp = now_ts();
        let fingerprint = compute_fingerprint(&sender, &receiver, amount, kind, timestamp, &resource);
        Self { sender, receiver, amount, kind, resource, timestamp, fingerprint }
    }

    /// Constructs a transaction with no resource payload.
    pub fn bare(sender: impl Into<String>, receiver: impl Into<String>, amount: Credits, kind: TxKind) -> Self {
        Self::new(sender, receiver, amount, kind, ResourcePayload::new())
    }

    /// Returns the precomputed content fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether `self` is a synthetic minting transaction (sender is the
    /// reserved system identity).
    pub fn is_system_sent(&self) -> bool {
        self.sender == crate::identity::SYSTEM_SENDER
    }
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

/// `SHA-256` over the canonical serialization of
/// `(sender, receiver, amount, kind, timestamp, resource)`, with the amount
/// stringified at fixed precision and the resource payload already
/// key-ordered by virtue of being a `BTreeMap`.
fn compute_fingerprint(
    sender: &str,
    receiver: &str,
    amount: Credits,
    kind: TxKind,
    timestamp: f64,
    resource: &ResourcePayload,
) -> String {
    let kind_tag = serde_json::to_string(&kind).expect("tx kind serializes");
    let resource_json = serde_json::to_string(resource).expect("resource payload serializes");
    let canonical = format!(
        "{sender}|{receiver}|{amount}|{kind_tag}|{timestamp}|{resource_json}",
        amount = amount.canonical(),
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}
