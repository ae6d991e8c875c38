//! The per-session ban decision pipeline.

use std::sync::Arc;
use std::time::Duration;

use bangate_cache::{ExpiringCache, InFlightGuard};
use bangate_types::{
    BanStore, PlayerId, PlayerProfile, PlayerSession, ProfileError,
    ProfileService, SlotId,
};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::host::{HostAction, HostQueue};
use crate::reason::sanitize_kick_reason;
use crate::refresh::should_refresh;

/// Name written to the store when a brand-new player has an empty display
/// name. The store schema requires a non-empty name column.
const FALLBACK_NAME: &str = "Unknown";

/// Reason used for fail-closed kicks when the ban check itself failed.
const UNAVAILABLE_REASON: &str = "Ban check unavailable. Try again later.";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the decision pipeline.
///
/// Built by the plugin layer from the validated settings surface; the
/// pipeline itself does no clamping.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reason shown to banned players. Sanitized at dispatch time.
    pub kick_reason: String,

    /// What to do when the ban lookup itself fails: `true` (default) lets
    /// the player through, `false` kicks with a generic reason.
    pub fail_open: bool,

    /// Insert a minimal store record for players the store has never seen.
    pub insert_if_missing: bool,

    /// How old a record's profile fields may get before a store-path
    /// lookup re-fetches them. Zero disables refreshing.
    pub refresh_window: Duration,

    /// API key for the profile service. `None` disables profile fetching
    /// even when a service is wired in.
    pub profile_api_key: Option<String>,

    /// Upper bound on one profile fetch.
    pub profile_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kick_reason: "You are banned from this server.".into(),
            fail_open: true,
            insert_if_missing: true,
            refresh_window: Duration::from_secs(24 * 60 * 60),
            profile_api_key: None,
            profile_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Where an allow verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowSource {
    /// Fresh cache entry said "not banned"; store never consulted.
    Cache,
    /// Store record said "not banned".
    Store,
    /// Store had no record; a new player is never banned by construction.
    NewRecord,
}

/// Where a kick verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickSource {
    /// Fresh cache entry said "banned"; store never consulted.
    Cache,
    /// Store record said "banned".
    Store,
    /// Ban lookup failed and the policy is fail-closed.
    Unavailable,
}

/// Terminal state of one pipeline run.
///
/// Every variant implies the in-flight guard has been released. The
/// enum exists for logging and tests; the player-visible effect is only
/// ever "nothing" or "a queued kick".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A pipeline was already in flight for this slot; signal dropped.
    Duplicate,
    /// Bot, spectator, or missing stable identity; no I/O performed.
    Ineligible,
    /// Player allowed through.
    Allowed(AllowSource),
    /// Ban lookup failed but the fail-open policy let the player through.
    AllowedFailOpen,
    /// Kick queued onto the host inbox.
    Kicked(KickSource),
    /// Shutdown observed mid-flight; unwound with no side effects.
    Cancelled,
}

/// Marker for "the shutdown signal fired while we were suspended".
struct Cancelled;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The join-time ban decision pipeline.
///
/// One instance per plugin, shared across all spawned per-session tasks
/// behind an `Arc`. State machine per session:
///
/// ```text
/// Admitted → CacheCheck → {CacheHit | StoreLookup} → {Allow | Kick} → Released
/// ```
///
/// `Released` (guard release) is guaranteed by a drop guard covering every
/// exit path, including panic unwind and cancellation.
pub struct Pipeline<S, P> {
    cache: Arc<ExpiringCache<PlayerId, bool>>,
    guard: Arc<InFlightGuard>,
    store: Arc<S>,
    profile: Option<Arc<P>>,
    config: PipelineConfig,
    host: HostQueue,
    shutdown: watch::Receiver<bool>,
}

/// Releases the admitted slot when dropped, whatever the exit path.
struct ReleaseOnDrop<'a> {
    guard: &'a InFlightGuard,
    slot: SlotId,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.guard.release(self.slot);
    }
}

impl<S, P> Pipeline<S, P>
where
    S: BanStore,
    P: ProfileService,
{
    /// Wires a pipeline to its collaborators.
    ///
    /// `profile: None` disables the refresh feature entirely; so does a
    /// missing `profile_api_key` in the config.
    pub fn new(
        cache: Arc<ExpiringCache<PlayerId, bool>>,
        guard: Arc<InFlightGuard>,
        store: Arc<S>,
        profile: Option<Arc<P>>,
        config: PipelineConfig,
        host: HostQueue,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cache,
            guard,
            store,
            profile,
            config,
            host,
            shutdown,
        }
    }

    /// Admits the slot and runs the full decision for one join event.
    ///
    /// Admission happens before the first await, so this is safe to call
    /// directly from the join event. Callers that spawn the decision onto
    /// a worker task must NOT use this entry point: admit on the event
    /// thread instead and spawn [`handle_admitted`](Self::handle_admitted),
    /// or admission races the disconnect events. The returned outcome is
    /// for logging and tests; verdicts go through the host queue.
    pub async fn handle_join(&self, session: PlayerSession) -> JoinOutcome {
        if !self.guard.try_admit(session.slot) {
            trace!(slot = %session.slot, "duplicate join signal dropped");
            return JoinOutcome::Duplicate;
        }
        self.handle_admitted(session).await
    }

    /// Runs the decision for a slot the caller has already admitted.
    ///
    /// The entry point for event-loop integrations: admission happens
    /// synchronously at the join event, on the thread that also delivers
    /// disconnects, so it stays ordered with releases; the decision itself
    /// is then spawned fire-and-forget. Never panics outward and never
    /// touches host APIs.
    pub async fn handle_admitted(&self, session: PlayerSession) -> JoinOutcome {
        let slot = session.slot;
        // From here on, release is guaranteed no matter how we exit.
        let _release = ReleaseOnDrop {
            guard: &self.guard,
            slot,
        };

        if !session.is_eligible() {
            trace!(%slot, kind = ?session.kind, "session not eligible for ban check");
            return JoinOutcome::Ineligible;
        }
        // is_eligible() guarantees the id is present.
        let Some(player_id) = session.player_id.clone() else {
            return JoinOutcome::Ineligible;
        };

        // --- CacheCheck ---
        if let Some(banned) = self.cache.get(&player_id) {
            return if banned {
                debug!(%slot, %player_id, "cache hit: banned");
                self.queue_kick(slot, player_id, &self.config.kick_reason);
                JoinOutcome::Kicked(KickSource::Cache)
            } else {
                // Cache hits are fresh by definition within the TTL
                // window: no refresh check on this path.
                trace!(%slot, %player_id, "cache hit: clean");
                JoinOutcome::Allowed(AllowSource::Cache)
            };
        }

        // --- StoreLookup ---
        let lookup = match self.cancellable(self.store.lookup_ban(&player_id)).await {
            Ok(result) => result,
            Err(Cancelled) => return JoinOutcome::Cancelled,
        };

        match lookup {
            Ok(Some(record)) => {
                self.cache.set(player_id.clone(), record.banned);
                if record.banned {
                    info!(%slot, %player_id, "store lookup: banned");
                    self.queue_kick(slot, player_id, &self.config.kick_reason);
                    JoinOutcome::Kicked(KickSource::Store)
                } else {
                    let stale =
                        should_refresh(record.last_updated, self.config.refresh_window);
                    if stale {
                        match self.refresh_profile(&player_id).await {
                            Err(Cancelled) => return JoinOutcome::Cancelled,
                            Ok(true) => {}
                            Ok(false) => {
                                return self.apply_failure_policy(
                                    slot,
                                    player_id,
                                    AllowSource::Store,
                                );
                            }
                        }
                    }
                    JoinOutcome::Allowed(AllowSource::Store)
                }
            }
            Ok(None) => match self.handle_new_player(&session, &player_id).await {
                Err(Cancelled) => JoinOutcome::Cancelled,
                Ok(true) => JoinOutcome::Allowed(AllowSource::NewRecord),
                Ok(false) => {
                    self.apply_failure_policy(slot, player_id, AllowSource::NewRecord)
                }
            },
            Err(e) => {
                warn!(%slot, %player_id, error = %e, "ban lookup failed");
                if self.config.fail_open {
                    JoinOutcome::AllowedFailOpen
                } else {
                    self.queue_kick(slot, player_id, UNAVAILABLE_REASON);
                    JoinOutcome::Kicked(KickSource::Unavailable)
                }
            }
        }
    }

    /// Store-miss path: optional minimal insert, unconditional profile
    /// fetch (a new record is maximally stale), then cache "not banned".
    ///
    /// Returns `Ok(false)` when the insert or the refresh failed; the
    /// caller routes that through the failure policy. The verdict is
    /// cached either way — a brand-new player is never banned by
    /// construction.
    async fn handle_new_player(
        &self,
        session: &PlayerSession,
        player_id: &PlayerId,
    ) -> Result<bool, Cancelled> {
        let mut clean = true;

        if self.config.insert_if_missing {
            let trimmed = session.display_name.trim();
            let fallback = if trimmed.is_empty() {
                FALLBACK_NAME
            } else {
                trimmed
            };
            match self
                .cancellable(self.store.insert_if_missing(player_id, fallback))
                .await?
            {
                Ok(()) => debug!(%player_id, "inserted new player record"),
                Err(e) => {
                    warn!(%player_id, error = %e, "insert-if-missing failed");
                    clean = false;
                }
            }
        }

        if !self.refresh_profile(player_id).await? {
            clean = false;
        }

        self.cache.set(player_id.clone(), false);
        Ok(clean)
    }

    /// Fetches the external profile and upserts its display fields,
    /// forcing the record identity to `player_id`.
    ///
    /// Returns `Ok(false)` when the fetch or the upsert failed; the caller
    /// routes that through the fail-open/fail-closed policy. A disabled
    /// refresh (no service, no API key) and a service that simply has no
    /// such player both count as clean.
    async fn refresh_profile(&self, player_id: &PlayerId) -> Result<bool, Cancelled> {
        let Some(service) = self.profile.as_deref() else {
            return Ok(true);
        };
        let Some(api_key) = self.config.profile_api_key.as_deref() else {
            trace!(%player_id, "profile refresh skipped: no API key");
            return Ok(true);
        };

        let fetch = tokio::time::timeout(
            self.config.profile_timeout,
            service.fetch_profile(api_key, player_id),
        );
        let fetched = match self.cancellable(fetch).await? {
            Ok(result) => result,
            Err(_elapsed) => Err(ProfileError::Timeout),
        };

        match fetched {
            Ok(Some(profile)) => self.persist_profile(profile, player_id).await,
            Ok(None) => {
                debug!(%player_id, "profile service has no such player");
                Ok(true)
            }
            Err(e) => {
                warn!(%player_id, error = %e, "profile fetch failed");
                Ok(false)
            }
        }
    }

    async fn persist_profile(
        &self,
        profile: PlayerProfile,
        player_id: &PlayerId,
    ) -> Result<bool, Cancelled> {
        // The service's reported identity is untrusted: pin the record to
        // the id we actually queried for.
        let profile = profile.with_identity(player_id.clone());
        match self.cancellable(self.store.upsert_profile(&profile)).await? {
            Ok(()) => {
                debug!(%player_id, "profile refreshed");
                Ok(true)
            }
            Err(e) => {
                warn!(%player_id, error = %e, "profile upsert failed");
                Ok(false)
            }
        }
    }

    /// Applies the fail-open/fail-closed policy after a store or profile
    /// operation failed with the ban verdict itself already known.
    fn apply_failure_policy(
        &self,
        slot: SlotId,
        player_id: PlayerId,
        source: AllowSource,
    ) -> JoinOutcome {
        if self.config.fail_open {
            JoinOutcome::Allowed(source)
        } else {
            // The kicked session must not leave a cached verdict behind
            // that would let a rejoin bypass the still-failing backend.
            self.cache.remove(&player_id);
            self.queue_kick(slot, player_id, UNAVAILABLE_REASON);
            JoinOutcome::Kicked(KickSource::Unavailable)
        }
    }

    /// Queues a kick for the host thread. The reason is sanitized here so
    /// no caller can bypass the hygiene pass.
    fn queue_kick(&self, slot: SlotId, player_id: PlayerId, reason: &str) {
        self.host.push(HostAction::Kick {
            slot,
            player_id,
            reason: sanitize_kick_reason(reason),
        });
    }

    /// Races `fut` against the process-wide shutdown signal.
    ///
    /// Every suspend point in the pipeline goes through here, so shutdown
    /// unwinds the task at the next await with no further side effects.
    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = T>,
    ) -> Result<T, Cancelled> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(Cancelled);
        }
        tokio::select! {
            // Sender dropped counts as shutdown too: the plugin is gone.
            _ = shutdown.changed() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}

/// A profile service that knows nobody.
///
/// Plugs the `P` type parameter when profile refreshing is disabled — the
/// pipeline short-circuits on the missing API key or `profile: None`, so
/// this is never actually awaited in that configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfileService;

impl ProfileService for NoProfileService {
    async fn fetch_profile(
        &self,
        _api_key: &str,
        _player_id: &PlayerId,
    ) -> Result<Option<PlayerProfile>, ProfileError> {
        Ok(None)
    }
}
