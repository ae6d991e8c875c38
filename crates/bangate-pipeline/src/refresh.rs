//! Profile refresh policy: is a cached store record stale enough to
//! re-fetch from the external profile service?

use std::time::{Duration, SystemTime};

/// Decides whether a store record's profile fields should be refreshed.
///
/// Pure and deterministic given its inputs:
/// - a zero `window` disables refreshing entirely;
/// - an absent `last_updated` (no prior record, or a store that doesn't
///   track it) always refreshes — unknown age is maximally stale;
/// - otherwise, refresh iff the record is strictly older than `window`.
///
/// A `last_updated` in the future (store clock ahead of ours) counts as
/// fresh rather than as an error.
pub fn should_refresh_at(
    last_updated: Option<SystemTime>,
    window: Duration,
    now: SystemTime,
) -> bool {
    if window.is_zero() {
        return false;
    }
    match last_updated {
        None => true,
        Some(ts) => match now.duration_since(ts) {
            Ok(age) => age > window,
            Err(_) => false,
        },
    }
}

/// [`should_refresh_at`] against the current wall clock.
pub fn should_refresh(last_updated: Option<SystemTime>, window: Duration) -> bool {
    should_refresh_at(last_updated, window, SystemTime::now())
}
