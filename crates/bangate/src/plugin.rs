//! Plugin lifecycle: the process-scoped object that owns the gate.
//!
//! No implicit statics — the host integration constructs one
//! [`BangatePlugin`] on load and drops it (after [`unload`]) on shutdown.
//! The plugin owns the cache, guard, pipeline, heartbeat, and the host
//! decision inbox, and exposes the three host-facing events:
//!
//! - [`on_player_join`] — sync, host thread: admit and spawn the pipeline
//! - [`on_player_disconnect`] — release the slot (idempotent)
//! - [`pump_host_actions`] — once per host tick: drain queued kicks
//!
//! [`unload`]: BangatePlugin::unload
//! [`on_player_join`]: BangatePlugin::on_player_join
//! [`on_player_disconnect`]: BangatePlugin::on_player_disconnect
//! [`pump_host_actions`]: BangatePlugin::pump_host_actions

use std::sync::{Arc, Mutex};

use bangate_cache::{ExpiringCache, InFlightGuard};
use bangate_heartbeat::{HeartbeatHandle, HeartbeatScheduler};
use bangate_pipeline::{HostApi, HostInbox, HostQueue, Pipeline, host_channel};
use bangate_types::{BanStore, PlayerId, PlayerSession, ProfileService, SlotId};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::commands::{Command, CommandError, CommandSource};
use crate::settings::Settings;

type BanCache = ExpiringCache<PlayerId, bool>;

/// The ban gate plugin.
///
/// Generic over the store and profile-service backends the host
/// integration provides. All methods take `&self`: the plugin is designed
/// to sit behind an `Arc` shared between the host event handlers and the
/// admin command dispatcher.
pub struct BangatePlugin<S, P> {
    settings: Mutex<Settings>,
    store: Arc<S>,
    profile: Option<Arc<P>>,
    guard: Arc<InFlightGuard>,
    // Cache and pipeline are swapped wholesale on reload (the TTL is a
    // construction-time parameter), so they live behind their own locks.
    cache: Mutex<Arc<BanCache>>,
    pipeline: Mutex<Arc<Pipeline<S, P>>>,
    inbox: Mutex<HostInbox>,
    queue: HostQueue,
    heartbeat: Mutex<Option<HeartbeatHandle<S>>>,
    shutdown_tx: watch::Sender<bool>,
    /// Handle to the runtime captured at load time, so join events
    /// arriving on the host thread can still spawn worker tasks.
    runtime: tokio::runtime::Handle,
}

impl<S, P> BangatePlugin<S, P>
where
    S: BanStore,
    P: ProfileService,
{
    /// Builds the gate from validated settings and starts the heartbeat
    /// (when registration is enabled and a server key resolves).
    ///
    /// Must be called from within a Tokio runtime; the plugin captures the
    /// runtime handle for later fire-and-forget spawns from the host
    /// thread.
    pub fn load(settings: Settings, store: Arc<S>, profile: Option<Arc<P>>) -> Self {
        let settings = settings.validated();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue, inbox) = host_channel();
        let guard = Arc::new(InFlightGuard::new());

        let cache: Arc<BanCache> = Arc::new(ExpiringCache::new(settings.cache_ttl()));
        let pipeline = Arc::new(build_pipeline(
            &settings,
            Arc::clone(&cache),
            Arc::clone(&guard),
            Arc::clone(&store),
            profile.clone(),
            queue.clone(),
            shutdown_rx.clone(),
        ));
        let heartbeat = spawn_heartbeat(&settings, &store, shutdown_rx);

        info!(
            fail_open = settings.ban_check.fail_open,
            cache_seconds = settings.ban_check.cache_seconds,
            registration = settings.registration.enabled,
            "ban gate loaded"
        );

        Self {
            settings: Mutex::new(settings),
            store,
            profile,
            guard,
            cache: Mutex::new(cache),
            pipeline: Mutex::new(pipeline),
            inbox: Mutex::new(inbox),
            queue,
            heartbeat: Mutex::new(heartbeat),
            shutdown_tx,
            runtime: tokio::runtime::Handle::current(),
        }
    }

    /// Tears the gate down: raises the shutdown signal (every in-flight
    /// pipeline unwinds at its next suspend point), stops the heartbeat,
    /// and clears the shared state.
    pub fn unload(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(heartbeat) = self.lock_heartbeat().take() {
            heartbeat.abort();
        }
        self.lock_cache().clear();
        self.guard.clear();
        info!("ban gate unloaded");
    }

    /// Host join event. Synchronous and non-blocking: admits the slot on
    /// the calling thread, then spawns the decision fire-and-forget.
    ///
    /// Admission must happen here and not inside the spawned task — the
    /// host thread delivers joins and disconnects in order, and a rapid
    /// disconnect-and-rejoin on a reused slot relies on that order to not
    /// be misread as a duplicate join.
    pub fn on_player_join(&self, session: PlayerSession) {
        let slot = session.slot;
        if !self.guard.try_admit(slot) {
            debug!(%slot, "duplicate join signal dropped");
            return;
        }
        let pipeline = Arc::clone(&self.lock_pipeline());
        self.runtime.spawn(async move {
            let outcome = pipeline.handle_admitted(session).await;
            debug!(?outcome, "join pipeline finished");
        });
    }

    /// Host disconnect event. Releases the slot so a future join on it is
    /// not blocked by a pipeline that will never act. Idempotent.
    pub fn on_player_disconnect(&self, slot: SlotId) {
        self.guard.release(slot);
    }

    /// Drains queued decisions. Call once per host tick, from the host
    /// thread (the only place the kick primitive is safe). Returns the
    /// number of kicks executed.
    pub fn pump_host_actions(&self, host: &impl HostApi) -> usize {
        self.lock_inbox().drain(host)
    }

    /// Dispatches a parsed administrative command.
    ///
    /// `load_settings` is the host's settings loader, invoked only for
    /// `reload` — file I/O stays the host's concern.
    pub fn handle_command(
        &self,
        source: CommandSource,
        command: Command,
        load_settings: impl FnOnce() -> Settings,
    ) -> Result<(), CommandError> {
        if source != CommandSource::Console {
            return Err(CommandError::ConsoleOnly);
        }
        match command {
            Command::Reload => {
                self.reload(load_settings());
                Ok(())
            }
            Command::Register { server_key } => {
                self.register(server_key);
                Ok(())
            }
        }
    }

    /// Applies a new settings object: rebuilds the cache with the new TTL
    /// and the pipeline with the new policy, and restarts the heartbeat
    /// with the new interval. In-flight pipelines finish against the old
    /// cache; new joins see the new one.
    pub fn reload(&self, settings: Settings) {
        let settings = settings.validated();
        // Admin commands arrive on the host/console thread, which is not a
        // runtime worker; enter the captured handle so the heartbeat
        // respawn can spawn its task.
        let _rt = self.runtime.enter();

        let cache: Arc<BanCache> = Arc::new(ExpiringCache::new(settings.cache_ttl()));
        let shutdown_rx = self.shutdown_tx.subscribe();
        let pipeline = Arc::new(build_pipeline(
            &settings,
            Arc::clone(&cache),
            Arc::clone(&self.guard),
            Arc::clone(&self.store),
            self.profile.clone(),
            self.queue.clone(),
            shutdown_rx.clone(),
        ));

        *self.lock_cache() = cache;
        *self.lock_pipeline() = pipeline;

        let mut heartbeat = self.lock_heartbeat();
        if let Some(old) = heartbeat.take() {
            old.abort();
        }
        *heartbeat = spawn_heartbeat(&settings, &self.store, shutdown_rx);
        drop(heartbeat);

        *self.lock_settings() = settings;
        info!("settings reloaded");
    }

    /// Persists a new server key and triggers an immediate registration.
    /// Enables registration if it was off — issuing the command is an
    /// explicit request to be announced.
    pub fn register(&self, server_key: String) {
        let identity = {
            let mut settings = self.lock_settings();
            settings.registration.server_key = server_key;
            settings.registration.enabled = true;
            settings.server_identity()
        };
        let Some(identity) = identity else {
            // Unreachable in practice: we just stored a non-empty key.
            warn!("register command produced no server identity");
            return;
        };

        // Like reload, this runs on the host/console thread: both the
        // out-of-band registration and a fresh scheduler need the runtime.
        let _rt = self.runtime.enter();
        let mut heartbeat = self.lock_heartbeat();
        match heartbeat.as_ref() {
            Some(handle) => {
                handle.update_identity(identity);
                handle.register_now();
            }
            None => {
                let config = self.lock_settings().heartbeat_config();
                *heartbeat = Some(HeartbeatScheduler::spawn(
                    Arc::clone(&self.store),
                    identity,
                    config,
                    self.shutdown_tx.subscribe(),
                ));
            }
        }
    }

    /// Number of pipelines currently in flight.
    pub fn in_flight(&self) -> usize {
        self.guard.len()
    }

    // Poisoning can only come from a panicking pipeline; the data under
    // each of these locks is swapped wholesale, never left half-written.
    fn lock_settings(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Arc<BanCache>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_pipeline(&self) -> std::sync::MutexGuard<'_, Arc<Pipeline<S, P>>> {
        self.pipeline.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_inbox(&self) -> std::sync::MutexGuard<'_, HostInbox> {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_heartbeat(&self) -> std::sync::MutexGuard<'_, Option<HeartbeatHandle<S>>> {
        self.heartbeat.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn build_pipeline<S, P>(
    settings: &Settings,
    cache: Arc<BanCache>,
    guard: Arc<InFlightGuard>,
    store: Arc<S>,
    profile: Option<Arc<P>>,
    queue: HostQueue,
    shutdown_rx: watch::Receiver<bool>,
) -> Pipeline<S, P>
where
    S: BanStore,
    P: ProfileService,
{
    let api_key = settings.resolved_api_key();
    if settings.steam.use_steam_web_api && api_key.is_none() {
        warn!(
            var = %settings.steam.api_key_env_var,
            "profile API key env var unset — profile refresh disabled"
        );
    }
    Pipeline::new(
        cache,
        guard,
        store,
        profile,
        settings.pipeline_config(api_key),
        queue,
        shutdown_rx,
    )
}

fn spawn_heartbeat<S: BanStore>(
    settings: &Settings,
    store: &Arc<S>,
    shutdown_rx: watch::Receiver<bool>,
) -> Option<HeartbeatHandle<S>> {
    if !settings.registration.enabled {
        debug!("registration disabled — heartbeat not started");
        return None;
    }
    let Some(identity) = settings.server_identity() else {
        warn!(
            var = %settings.registration.server_key_env_var,
            "no server key in settings or environment — heartbeat not started"
        );
        return None;
    };
    Some(HeartbeatScheduler::spawn(
        Arc::clone(store),
        identity,
        settings.heartbeat_config(),
        shutdown_rx,
    ))
}
