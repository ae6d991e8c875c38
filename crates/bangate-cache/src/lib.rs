//! The only shared mutable state in the ban gate.
//!
//! Two small structures, each behind its own narrow lock:
//!
//! 1. [`ExpiringCache`] — key→value store with per-entry absolute expiry
//!    and lazy read-time eviction. Caches ban verdicts so a reconnecting
//!    player doesn't hit the store every time.
//! 2. [`InFlightGuard`] — a mutual-exclusion set keyed by connection slot,
//!    ensuring at most one decision pipeline runs per slot.
//!
//! # Lock discipline
//!
//! The two structures are never locked simultaneously: guard admission
//! happens before any cache access, and guard release happens after all
//! cache access completes. Neither lock is ever held across an await
//! point (every method here is synchronous and O(1) apart from `clear`).

mod cache;
mod guard;

pub use cache::ExpiringCache;
pub use guard::InFlightGuard;
