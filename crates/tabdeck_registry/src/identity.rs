//! Session identity allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::model::TabId;

/// Source of fresh tab identities, injected into the registry.
pub trait IdentitySource: Send + Sync {
    /// Next process-local id: strictly increasing, never zero, never reused.
    /// `None` once the id space is used up.
    fn next_id(&self) -> Option<TabId>;

    /// Durable identifier for a tab whose producer supplied none.
    fn next_session_id(&self) -> String;

    /// Records that `id` is in use (restored with an explicit id) so that
    /// `next_id` never hands it out again.
    fn reserve(&self, id: TabId);
}

/// Default allocator: a monotonic counter plus v4 UUIDs.
#[derive(Debug)]
pub struct SessionIdentityAllocator {
    /// Next id to hand out; 0 once `u64::MAX` has been used.
    next: AtomicU64,
}

impl SessionIdentityAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SessionIdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySource for SessionIdentityAllocator {
    fn next_id(&self) -> Option<TabId> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
                (raw != 0).then(|| raw.checked_add(1).unwrap_or(0))
            })
            .ok()
            .and_then(TabId::new)
    }

    fn next_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn reserve(&self, id: TabId) {
        let _ = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
                if raw == 0 {
                    return None;
                }
                Some(id.get().checked_add(1).map_or(0, |after| raw.max(after)))
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_strictly_increase_and_skip_zero() {
        let allocator = SessionIdentityAllocator::new();
        let ids: Vec<u64> = (0..1000).map(|_| allocator.next_id().unwrap().get()).collect();

        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| *id != 0));
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        let distinct: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), 1000);
    }

    #[test]
    fn test_reserve_skips_restored_ids() {
        let allocator = SessionIdentityAllocator::new();
        allocator.reserve(TabId::new(41).unwrap());
        assert_eq!(allocator.next_id().unwrap().get(), 42);

        // Reserving something lower never moves the counter back.
        allocator.reserve(TabId::new(3).unwrap());
        assert_eq!(allocator.next_id().unwrap().get(), 43);
    }

    #[test]
    fn test_exhausted_counter_stops_handing_out_ids() {
        let allocator = SessionIdentityAllocator::new();
        allocator.reserve(TabId::new(u64::MAX - 1).unwrap());
        assert_eq!(allocator.next_id().map(TabId::get), Some(u64::MAX));
        assert_eq!(allocator.next_id(), None);
        assert_eq!(allocator.next_id(), None);

        // Reserving a low id does not revive the counter.
        allocator.reserve(TabId::new(5).unwrap());
        assert_eq!(allocator.next_id(), None);
    }

    #[test]
    fn test_reserving_max_id_exhausts_counter() {
        let allocator = SessionIdentityAllocator::new();
        allocator.reserve(TabId::new(u64::MAX).unwrap());
        assert_eq!(allocator.next_id(), None);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let allocator = SessionIdentityAllocator::new();
        let a = allocator.next_session_id();
        let b = allocator.next_session_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
