//! # Entity Handles
//!
//! Entities are opaque 64-bit identifiers owned by the caller. The archive
//! only relies on them being unique.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an entity.
///
/// The archive never interprets the bits; any unique source works.
/// [`Entity::INVALID`] is reserved for "no entity".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Null/invalid entity.
    pub const INVALID: Self = Self(u64::MAX);

    /// Wraps a raw identifier.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Checks that this is not the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Entity({})", self.0)
        } else {
            f.write_str("Entity(INVALID)")
        }
    }
}

/// Monotonic entity source.
///
/// Hands out `1, 2, 3, ...` and never reuses a value. Safe to share between
/// threads.
#[derive(Debug)]
pub struct EntitySequence {
    next: AtomicU64,
}

impl EntitySequence {
    /// Creates a sequence starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next unused entity.
    pub fn next_entity(&self) -> Entity {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        debug_assert!(raw != u64::MAX, "entity sequence exhausted");
        Entity(raw)
    }
}

impl Default for EntitySequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        assert!(!Entity::INVALID.is_valid());
        assert!(!Entity::default().is_valid());
        assert!(Entity::from_raw(0).is_valid());
    }

    #[test]
    fn test_sequence_is_unique() {
        let seq = EntitySequence::new();
        let a = seq.next_entity();
        let b = seq.next_entity();
        assert_ne!(a, b);
        assert_eq!(a.to_raw() + 1, b.to_raw());
    }

    #[test]
    fn test_display() {
        assert_eq!(Entity::from_raw(7).to_string(), "Entity(7)");
        assert_eq!(Entity::INVALID.to_string(), "Entity(INVALID)");
    }
}
