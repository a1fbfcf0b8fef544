//! # Locking Policy
//!
//! The archive itself is single-threaded: structural changes take
//! `&mut self` and the borrow checker does the rest. When an archive must be
//! shared, wrap it in a [`SharedArchive`] and pick the lock at construction:
//!
//! ```text
//! Simulation thread:  attach / detach / destroy   -> exclusive lock
//! Render thread:      get / contains / filters    -> shared lock
//! ```
//!
//! - [`ThreadSafeArchive`]: `parking_lot` reader/writer lock
//! - [`LocalArchive`]: borrow flag, panics on conflicting access

mod lock;
mod shared;

pub use lock::LocalRawRwLock;
pub use shared::{LocalArchive, SharedArchive, SharedHandle, ThreadSafeArchive};
