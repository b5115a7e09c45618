//! Ledger identity derivation.
//!
//! Each user handle is mapped, once, at registration time, to a stable
//! 16-hex-character identity string. The identity is the on-chain
//! pseudonym; the handle itself never appears in a transaction.

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reserved identity denoting the system itself: the sender of minting
/// transactions (initial endowment, mining reward).
pub const SYSTEM_SENDER: &str = "0";

/// Reserved identity used as the receiver of the genesis transaction.
pub const SYSTEM_RECEIVER: &str = "system";

/// Derives a 16-hex-character identity from `handle` and the current wall
/// clock. Two registrations of the same handle in the same process produce
/// different identities because the clock component differs — identities
/// are not required to be reproducible, only unique per registration.
pub fn derive(handle: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(handle.as_bytes());
    hasher.update(now.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
