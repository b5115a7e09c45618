//! Nexus Core Library
//!
//! A small resource-exchange ledger: users register, declare resources they
//! host, and pay each other in credits to download them. A single
//! proof-of-work chain orders every credit movement; balances are derived by
//! replaying it rather than stored directly.
//!
//! The facade is [`system::System`]; most callers only need that and
//! [`config::Config`].

pub mod amount;
pub mod block;
mod block_ext;
pub mod chain;
pub mod config;
pub mod error;
pub mod identity;
pub mod pow;
pub mod registry;
pub mod system;
pub mod transaction;

pub use amount::Credits;
pub use block::Block;
pub use chain::{Chain, ChainInfo};
pub use config::Config;
pub use error::{Error, Result};
pub use registry::{NewResource, Registry, ResourcePatch, SearchQuery, SharedFile};
pub use system::System;
pub use transaction::{ResourcePayload, Transaction, TxKind};
