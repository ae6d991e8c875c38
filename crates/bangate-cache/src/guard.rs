//! In-flight admission guard: at most one pipeline per slot.

use std::collections::HashSet;
use std::sync::Mutex;

use bangate_types::SlotId;

/// A mutual-exclusion set keyed by connection slot.
///
/// The host can deliver duplicate join signals for a slot (retransmitted
/// events, rapid reconnects onto a reused slot). The guard makes admission
/// atomic: the first signal wins, later ones are dropped entirely — not
/// queued, not retried.
///
/// ## Release discipline
///
/// A slot is released exactly once per session, by whichever comes first:
/// early rejection, pipeline completion, or the disconnect event.
/// [`release`](Self::release) is idempotent so the overlap between the
/// pipeline's guaranteed cleanup and the disconnect handler is harmless.
///
/// ## Slot reuse caveat
///
/// Slots are host-reused, so a release triggered by a disconnect can let a
/// fresh join admit the same slot while a stale pipeline still runs. That
/// stale pipeline's verdict is neutralized at dispatch time by the host
/// thread's liveness re-validation, not here.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    in_flight: Mutex<HashSet<SlotId>>,
}

impl InFlightGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically checks absence and inserts.
    ///
    /// Returns `true` if the slot was admitted, `false` if a pipeline is
    /// already in flight for it.
    pub fn try_admit(&self, slot: SlotId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slot)
    }

    /// Removes the slot if present. No-op (and no error) when absent.
    pub fn release(&self, slot: SlotId) {
        let removed = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&slot);
        if removed {
            tracing::trace!(%slot, "in-flight slot released");
        }
    }

    /// Whether a pipeline is currently in flight for the slot.
    pub fn is_in_flight(&self, slot: SlotId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&slot)
    }

    /// Drops all in-flight markers. Only safe at plugin teardown, after
    /// the shutdown signal has been raised.
    pub fn clear(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of slots currently in flight.
    pub fn len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// `true` when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_admit_first_call_succeeds() {
        let guard = InFlightGuard::new();
        assert!(guard.try_admit(SlotId(5)));
        assert!(guard.is_in_flight(SlotId(5)));
    }

    #[test]
    fn test_try_admit_duplicate_rejected() {
        let guard = InFlightGuard::new();
        assert!(guard.try_admit(SlotId(5)));
        assert!(!guard.try_admit(SlotId(5)));
    }

    #[test]
    fn test_try_admit_distinct_slots_independent() {
        let guard = InFlightGuard::new();
        assert!(guard.try_admit(SlotId(1)));
        assert!(guard.try_admit(SlotId(2)));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_release_allows_readmission() {
        let guard = InFlightGuard::new();
        assert!(guard.try_admit(SlotId(5)));
        guard.release(SlotId(5));
        assert!(guard.try_admit(SlotId(5)));
    }

    #[test]
    fn test_release_twice_is_idempotent() {
        let guard = InFlightGuard::new();
        guard.try_admit(SlotId(5));
        guard.release(SlotId(5));
        guard.release(SlotId(5)); // must not panic or error
        assert!(guard.is_empty());
    }

    #[test]
    fn test_release_absent_slot_is_noop() {
        let guard = InFlightGuard::new();
        guard.release(SlotId(99));
        assert!(guard.is_empty());
    }

    #[test]
    fn test_concurrent_admit_exactly_one_wins() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let guard = Arc::new(InFlightGuard::new());
        let admitted = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let admitted = Arc::clone(&admitted);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    if guard.try_admit(SlotId(7)) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_drops_all_markers() {
        let guard = InFlightGuard::new();
        guard.try_admit(SlotId(1));
        guard.try_admit(SlotId(2));

        guard.clear();

        assert!(guard.is_empty());
        assert!(guard.try_admit(SlotId(1)));
    }
}
