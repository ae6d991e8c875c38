//! Heartbeat scheduler: periodic re-announcement of server identity.
//!
//! Runs entirely apart from the per-player pipelines. On spawn it performs
//! one immediate registration, then re-registers on a fixed interval. Each
//! registration call runs on its own task, so a slow or down store can
//! never skew the timer loop — and a failed registration never disarms it.
//!
//! # Integration
//!
//! The plugin owns a [`HeartbeatHandle`]; the admin `register` command
//! swaps the identity and triggers an out-of-band registration through it:
//!
//! ```ignore
//! let handle = HeartbeatScheduler::spawn(store, identity, config, shutdown);
//! // later, from the admin command:
//! handle.update_identity(new_identity);
//! handle.register_now();
//! ```

use std::sync::Arc;
use std::time::Duration;

use bangate_types::{BanStore, ServerIdentity};
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the heartbeat scheduler.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Seconds between registrations. Clamped to
    /// [`Self::MIN_INTERVAL_SECS`] by [`validated`](Self::validated) —
    /// hammering the store faster than that buys nothing.
    pub interval_secs: u64,

    /// Random jitter (0–max ms) before the first registration, so a fleet
    /// of servers restarted together doesn't stampede the store.
    pub initial_jitter_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            initial_jitter_ms: 2_000,
        }
    }
}

impl HeartbeatConfig {
    /// Minimum supported registration interval.
    pub const MIN_INTERVAL_SECS: u64 = 10;

    /// Clamps out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.interval_secs < Self::MIN_INTERVAL_SECS {
            warn!(
                configured = self.interval_secs,
                min = Self::MIN_INTERVAL_SECS,
                "heartbeat interval below minimum — clamping"
            );
            self.interval_secs = Self::MIN_INTERVAL_SECS;
        }
        self
    }

    /// The registration interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Spawns and owns the heartbeat loop.
pub struct HeartbeatScheduler;

impl HeartbeatScheduler {
    /// Starts the heartbeat loop: one immediate registration, then one per
    /// interval, until `shutdown` flips (or its sender is dropped).
    pub fn spawn<S: BanStore>(
        store: Arc<S>,
        identity: ServerIdentity,
        config: HeartbeatConfig,
        shutdown: watch::Receiver<bool>,
    ) -> HeartbeatHandle<S> {
        let config = config.validated();
        debug!(
            key = %identity.key,
            interval_secs = config.interval_secs,
            "heartbeat scheduler starting"
        );

        let (identity_tx, identity_rx) = watch::channel(identity);
        let task = tokio::spawn(run_loop(
            Arc::clone(&store),
            identity_rx,
            config,
            shutdown,
        ));

        HeartbeatHandle {
            store,
            identity: identity_tx,
            task,
        }
    }
}

/// Handle to a running heartbeat loop.
pub struct HeartbeatHandle<S> {
    store: Arc<S>,
    identity: watch::Sender<ServerIdentity>,
    task: JoinHandle<()>,
}

impl<S: BanStore> HeartbeatHandle<S> {
    /// Swaps the identity announced on future registrations (timer-driven
    /// and manual alike). Does not itself trigger a registration.
    pub fn update_identity(&self, identity: ServerIdentity) {
        // send() only fails when the loop is gone; the identity is still
        // recorded for register_now().
        self.identity.send_replace(identity);
    }

    /// Triggers one out-of-band registration, independent of timer phase.
    /// Fire-and-forget: failures are logged like any other tick's.
    pub fn register_now(&self) {
        let store = Arc::clone(&self.store);
        let identity = self.identity.borrow().clone();
        tokio::spawn(async move {
            register_once(store, identity).await;
        });
    }

    /// Stops the timer loop immediately. Used on settings reload, where
    /// the scheduler is rebuilt with a new interval; normal shutdown goes
    /// through the watch signal instead.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the timer loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// One registration call. Failures are logged and swallowed — the next
/// tick retries by construction.
async fn register_once<S: BanStore>(store: Arc<S>, identity: ServerIdentity) {
    match store.upsert_server(&identity).await {
        Ok(()) => debug!(key = %identity.key, "server heartbeat registered"),
        Err(e) => warn!(key = %identity.key, error = %e, "server registration failed"),
    }
}

async fn run_loop<S: BanStore>(
    store: Arc<S>,
    identity: watch::Receiver<ServerIdentity>,
    config: HeartbeatConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    if config.initial_jitter_ms > 0 {
        let ms = rand::rng().random_range(0..config.initial_jitter_ms);
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
        }
    }

    // The first tick of an interval fires immediately: that is the
    // "register on start" call. Delay (not burst) after missed ticks — a
    // store outage must not be followed by a registration flood.
    let mut interval = tokio::time::interval(config.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("heartbeat scheduler stopping");
                    return;
                }
            }
            _ = interval.tick() => {
                // Registration runs on its own task so this loop is back
                // at the timer immediately.
                let store = Arc::clone(&store);
                let identity = identity.borrow().clone();
                tokio::spawn(async move {
                    register_once(store, identity).await;
                });
            }
        }
    }
}
