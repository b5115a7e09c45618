//! Error types for the **Nexus** core crate.
//!
//! Nearly every operation described in the ledger API reports failure
//! through `bool`/`Option` return values rather than through this type (see
//! the operation tables on [`crate::chain::Chain`], [`crate::registry::Registry`]
//! and [`crate::system::System`]). [`Error`] is reserved for the one failure
//! mode that is not expressible that way: a loudly-rejected duplicate
//! registration.
//!
//! Lock poisoning (a panicking holder of a `Mutex`/`RwLock` elsewhere in the
//! process) is recovered from at the lock site rather than propagated —
//! the data behind the lock is never left inconsistent by this crate's own
//! logic, so there is nothing meaningful for a caller to do with a
//! `Poisoned` variant beyond what recovering the guard already achieves.
//!
//! # Examples
//!
//! ```
//! use nexus_core::{Error, Result};
//!
//! fn demo_fn(fail: bool) -> Result<()> {
//!     if fail {
//!         Err(Error::UserExists("alice".into()))
//!     } else {
//!         Ok(())
//!     }
//! }
//! ```

use thiserror::Error;

/// Core crate error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// `register_user` called with a handle that is already registered.
    #[error("user already registered: {0}")]
    UserExists(String),
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
