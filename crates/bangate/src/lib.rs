//! # Bangate
//!
//! Join-time ban gate plugin for multiplayer game servers.
//!
//! Bangate sits between the host's join event and the game: every joining
//! player is checked against a relational ban store, with a short-lived
//! in-memory cache in front, an in-flight guard against duplicate checks,
//! and a kick queue that hands verdicts back to the host thread. A
//! background heartbeat periodically re-announces the server to a
//! directory table in the same store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bangate::prelude::*;
//!
//! // Implement BanStore (and optionally ProfileService) for your
//! // database, then:
//! // let plugin = BangatePlugin::load(settings, store, profile);
//! // ...wire plugin.on_player_join / on_player_disconnect /
//! // pump_host_actions into the host's event loop.
//! ```

pub mod commands;
pub mod error;
pub mod plugin;
pub mod settings;

/// Installs a global tracing subscriber reading `RUST_LOG` (default
/// `info`). For host integrations without their own logging setup; call
/// at most once, before [`BangatePlugin::load`].
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub use commands::{Command, CommandError, CommandSource};
pub use error::BangateError;
pub use plugin::BangatePlugin;
pub use settings::{
    BanCheckSettings, DatabaseSettings, RegistrationSettings, Settings, SteamSettings,
};

/// Everything a host integration typically needs, in one import.
pub mod prelude {
    pub use crate::commands::{Command, CommandError, CommandSource};
    pub use crate::error::BangateError;
    pub use crate::plugin::BangatePlugin;
    pub use crate::settings::Settings;

    pub use bangate_cache::{ExpiringCache, InFlightGuard};
    pub use bangate_heartbeat::{HeartbeatConfig, HeartbeatHandle, HeartbeatScheduler};
    pub use bangate_pipeline::{
        AllowSource, HostAction, HostApi, JoinOutcome, KickSource, NoProfileService, Pipeline,
        PipelineConfig,
    };
    pub use bangate_types::{
        BanLookup, BanStore, PlayerId, PlayerProfile, PlayerSession, ProfileError, ProfileService,
        ServerIdentity, SessionKind, SlotId, StoreError,
    };
}
