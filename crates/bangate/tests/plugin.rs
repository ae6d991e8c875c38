//! End-to-end tests for the plugin lifecycle: load, join events, host-tick
//! pumping, reload, register, unload.
//!
//! Join pipelines are fire-and-forget tasks, so tests yield (`settle`)
//! after each event to let them run; timer-dependent tests run under
//! paused Tokio time.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use bangate::{BangatePlugin, Command, CommandError, CommandSource, Settings};
use bangate_pipeline::{HostApi, NoProfileService};
use bangate_types::{
    BanLookup, BanStore, PlayerId, PlayerProfile, PlayerSession, ServerIdentity,
    SessionKind, SlotId, StoreError,
};

// =========================================================================
// Mock store
// =========================================================================

#[derive(Default)]
struct GateStore {
    records: Mutex<std::collections::HashMap<PlayerId, BanLookup>>,
    /// Artificial latency on lookups (paused-time tests only).
    lookup_delay: Option<Duration>,
    lookup_calls: AtomicUsize,
    registrations: AtomicUsize,
    keys_seen: Mutex<Vec<String>>,
}

impl GateStore {
    fn with_record(self, id: &str, banned: bool) -> Self {
        self.records.lock().unwrap().insert(
            PlayerId::from(id),
            BanLookup {
                banned,
                last_updated: Some(SystemTime::now()),
            },
        );
        self
    }

    fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl BanStore for GateStore {
    async fn lookup_ban(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<BanLookup>, StoreError> {
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(player_id).cloned())
    }

    async fn upsert_profile(
        &self,
        _profile: &PlayerProfile,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_if_missing(
        &self,
        _player_id: &PlayerId,
        _name_fallback: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_server(
        &self,
        identity: &ServerIdentity,
    ) -> Result<(), StoreError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.keys_seen.lock().unwrap().push(identity.key.clone());
        Ok(())
    }
}

// =========================================================================
// Mock host
// =========================================================================

struct MockHost {
    live: Vec<(SlotId, PlayerId)>,
    kicks: Mutex<Vec<(SlotId, String)>>,
}

impl MockHost {
    fn with_live(live: Vec<(SlotId, PlayerId)>) -> Self {
        Self {
            live,
            kicks: Mutex::new(Vec::new()),
        }
    }

    fn kicks(&self) -> Vec<(SlotId, String)> {
        self.kicks.lock().unwrap().clone()
    }
}

impl HostApi for MockHost {
    fn session_live(&self, slot: SlotId, player_id: &PlayerId) -> bool {
        self.live.iter().any(|(s, p)| *s == slot && p == player_id)
    }

    fn kick(&self, slot: SlotId, reason: &str) {
        self.kicks.lock().unwrap().push((slot, reason.to_string()));
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Plugin = BangatePlugin<GateStore, NoProfileService>;

fn load(settings: Settings, store: GateStore) -> (Plugin, Arc<GateStore>) {
    let store = Arc::new(store);
    let plugin = BangatePlugin::load(settings, Arc::clone(&store), None);
    (plugin, store)
}

/// Default settings with env-var names that are guaranteed unset, so a
/// developer's shell environment cannot leak into the tests.
fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.registration.server_key_env_var = "BANGATE_TEST_SERVER_KEY".into();
    settings.steam.api_key_env_var = "BANGATE_TEST_API_KEY".into();
    settings
}

fn registration_settings(key: &str) -> Settings {
    let mut settings = settings();
    settings.registration.enabled = true;
    settings.registration.server_key = key.into();
    settings
}

fn player(slot: u32, id: &str) -> PlayerSession {
    PlayerSession {
        slot: SlotId(slot),
        player_id: Some(PlayerId::from(id)),
        display_name: format!("name-{id}"),
        kind: SessionKind::Player,
    }
}

fn host_for(slot: u32, id: &str) -> MockHost {
    MockHost::with_live(vec![(SlotId(slot), PlayerId::from(id))])
}

/// Lets fire-and-forget pipeline tasks run to completion.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// =========================================================================
// Join → pump round trips
// =========================================================================

#[tokio::test]
async fn test_banned_join_kicks_on_next_pump() {
    let (plugin, _store) = load(settings(), GateStore::default().with_record("123", true));

    plugin.on_player_join(player(1, "123"));
    settle().await;

    let host = host_for(1, "123");
    assert_eq!(plugin.pump_host_actions(&host), 1);
    assert_eq!(host.kicks()[0], (SlotId(1), "You are banned from this server.".into()));
    assert_eq!(plugin.in_flight(), 0);
}

#[tokio::test]
async fn test_clean_join_allows_and_second_join_hits_cache() {
    let (plugin, store) = load(settings(), GateStore::default().with_record("123", false));

    plugin.on_player_join(player(1, "123"));
    settle().await;
    assert_eq!(store.lookups(), 1);

    // Same player rejoining within the TTL: verdict comes from the cache.
    plugin.on_player_join(player(2, "123"));
    settle().await;
    assert_eq!(store.lookups(), 1);

    let host = host_for(2, "123");
    assert_eq!(plugin.pump_host_actions(&host), 0);
    assert!(host.kicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_mid_check_frees_slot_and_stale_kick_is_dropped() {
    let store = GateStore {
        lookup_delay: Some(Duration::from_secs(5)),
        ..GateStore::default()
    }
    .with_record("stale", true);
    let (plugin, _store) = load(settings(), store);

    plugin.on_player_join(player(5, "stale"));
    settle().await;
    assert_eq!(plugin.in_flight(), 1);

    // Disconnect arrives while the lookup is still in flight.
    plugin.on_player_disconnect(SlotId(5));
    assert_eq!(plugin.in_flight(), 0);

    // Let the stale pipeline finish and queue its kick.
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;

    // Slot 5 now carries a different player; the stale kick must not fire.
    let host = host_for(5, "fresh");
    assert_eq!(plugin.pump_host_actions(&host), 0);
    assert!(host.kicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_reconnect_on_reused_slot_checks_new_player() {
    // Host-thread event order: join, disconnect, rejoin on the reused
    // slot — all delivered before any worker task gets to run. The rejoin
    // must be admitted at event time, not dropped as a duplicate of the
    // still-in-flight first pipeline.
    let store = GateStore {
        lookup_delay: Some(Duration::from_secs(5)),
        ..GateStore::default()
    }
    .with_record("banned-guy", true);
    let (plugin, _store) = load(settings(), store);

    plugin.on_player_join(player(5, "innocent"));
    plugin.on_player_disconnect(SlotId(5));
    plugin.on_player_join(player(5, "banned-guy"));
    assert_eq!(plugin.in_flight(), 1, "rejoin admitted at event time");

    // Let both pipelines reach the store call, then complete.
    settle().await;
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;

    let host = host_for(5, "banned-guy");
    assert_eq!(plugin.pump_host_actions(&host), 1);
    assert_eq!(host.kicks()[0].0, SlotId(5));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_join_signal_dropped_at_event_time() {
    let store = GateStore {
        lookup_delay: Some(Duration::from_secs(5)),
        ..GateStore::default()
    }
    .with_record("123", false);
    let (plugin, store) = load(settings(), store);

    plugin.on_player_join(player(7, "123"));
    plugin.on_player_join(player(7, "123"));
    assert_eq!(plugin.in_flight(), 1);

    settle().await;
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(store.lookups(), 1, "the duplicate never spawned a pipeline");
}

// =========================================================================
// Unload
// =========================================================================

#[tokio::test]
async fn test_unload_cancels_pending_joins() {
    let (plugin, _store) = load(settings(), GateStore::default().with_record("123", true));

    plugin.on_player_join(player(1, "123"));
    plugin.unload();
    settle().await;

    // The pipeline observed shutdown before acting: no lookup result is
    // used, no kick is queued, no slot is left admitted.
    let host = host_for(1, "123");
    assert_eq!(plugin.pump_host_actions(&host), 0);
    assert!(host.kicks().is_empty());
    assert_eq!(plugin.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unload_stops_heartbeat() {
    let (plugin, store) = load(registration_settings("srv-1"), GateStore::default());

    // Let the scheduler start its jitter sleep, then ride past it to the
    // registration-on-start tick.
    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(store.registrations(), 1);

    plugin.unload();
    settle().await;

    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(store.registrations(), 1, "no announcements after unload");
}

// =========================================================================
// Heartbeat wiring
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_load_with_registration_enabled_announces_on_schedule() {
    let (_plugin, store) = load(registration_settings("srv-1"), GateStore::default());

    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(store.registrations(), 1);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(store.registrations(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_load_with_registration_disabled_never_announces() {
    let (_plugin, store) = load(settings(), GateStore::default());

    tokio::time::advance(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(store.registrations(), 0);
}

// =========================================================================
// Commands
// =========================================================================

#[tokio::test]
async fn test_commands_rejected_for_player_source() {
    let (plugin, _store) = load(settings(), GateStore::default());
    let loader_called = std::cell::Cell::new(false);

    let result = plugin.handle_command(
        CommandSource::Player(SlotId(3)),
        Command::Reload,
        || {
            loader_called.set(true);
            settings()
        },
    );

    assert_eq!(result, Err(CommandError::ConsoleOnly));
    assert!(!loader_called.get(), "loader must not run for refused commands");
}

#[tokio::test]
async fn test_reload_rebuilds_cache_so_verdicts_are_relearned() {
    let (plugin, store) = load(settings(), GateStore::default().with_record("123", false));

    plugin.on_player_join(player(1, "123"));
    settle().await;
    plugin.on_player_join(player(2, "123"));
    settle().await;
    assert_eq!(store.lookups(), 1, "second join served from cache");

    plugin
        .handle_command(CommandSource::Console, Command::Reload, settings)
        .expect("console reload succeeds");

    // The reload swapped in a fresh cache: the verdict is looked up again.
    plugin.on_player_join(player(3, "123"));
    settle().await;
    assert_eq!(store.lookups(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_register_starts_heartbeat_when_none_running() {
    let (plugin, store) = load(settings(), GateStore::default());
    settle().await;
    assert_eq!(store.registrations(), 0);

    plugin
        .handle_command(
            CommandSource::Console,
            Command::Register {
                server_key: "srv-42".into(),
            },
            settings,
        )
        .expect("console register succeeds");

    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(store.registrations(), 1);
    assert_eq!(
        store.keys_seen.lock().unwrap().last().map(String::as_str),
        Some("srv-42")
    );
}

#[tokio::test(start_paused = true)]
async fn test_reload_and_register_work_from_non_runtime_thread() {
    // The console thread delivering admin commands is not a runtime
    // worker; reload and register must still be able to (re)spawn the
    // heartbeat without panicking.
    let (plugin, store) = load(settings(), GateStore::default());
    let plugin = Arc::new(plugin);

    let console = {
        let plugin = Arc::clone(&plugin);
        std::thread::spawn(move || plugin.reload(registration_settings("via-reload")))
    };
    console.join().expect("reload must not panic off-runtime");

    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(store.registrations(), 1);
    assert_eq!(
        store.keys_seen.lock().unwrap().last().map(String::as_str),
        Some("via-reload")
    );

    let console = {
        let plugin = Arc::clone(&plugin);
        std::thread::spawn(move || plugin.register("via-register".into()))
    };
    console.join().expect("register must not panic off-runtime");

    settle().await;
    assert_eq!(store.registrations(), 2);
    assert_eq!(
        store.keys_seen.lock().unwrap().last().map(String::as_str),
        Some("via-register")
    );
}

#[tokio::test(start_paused = true)]
async fn test_register_on_running_heartbeat_reannounces_new_key() {
    let (plugin, store) = load(registration_settings("old-key"), GateStore::default());

    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(store.registrations(), 1);

    plugin.register("new-key".into());
    settle().await;

    assert_eq!(store.registrations(), 2, "register announces out of band");
    let keys = store.keys_seen.lock().unwrap().clone();
    assert_eq!(keys.first().map(String::as_str), Some("old-key"));
    assert_eq!(keys.last().map(String::as_str), Some("new-key"));
}
