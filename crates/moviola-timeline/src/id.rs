//! Identity allocation.
//!
//! An injected allocator replaces a process-wide counter so tests and nested
//! engines can run with isolated ID spaces.

use core::sync::atomic::{AtomicI64, Ordering};
use serde::{Deserialize, Serialize};

/// Identity of a timeline. Nested render engines are rebuilt whenever the
/// referenced timeline's id changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimelineId(pub i64);

/// Identity of a track within a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub i64);

/// Monotonic ID allocator.
///
/// Pass one allocator per project; clones of the same project share it
/// through a reference.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicI64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }

    /// Start allocation at a given id, e.g. after loading a project.
    pub fn starting_at(next: i64) -> Self {
        Self {
            next: AtomicI64::new(next),
        }
    }

    pub fn next_timeline(&self) -> TimelineId {
        TimelineId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_track(&self) -> TrackId {
        TrackId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let ids = IdAllocator::new();
        let a = ids.next_timeline();
        let b = ids.next_timeline();
        assert_ne!(a, b);
    }

    #[test]
    fn test_isolated_allocators() {
        let a = IdAllocator::new();
        let b = IdAllocator::new();
        assert_eq!(a.next_track(), b.next_track());
    }
}
