//! The relational-store contract: the four operations the gate consumes.
//!
//! Bangate never speaks SQL itself. The host environment owns query
//! execution and schema creation; the gate sees exactly four operations
//! behind the [`BanStore`] trait. This keeps the decision pipeline testable
//! with an in-memory double and lets deployments swap MySQL/Postgres/SQLite
//! backends without touching gate code.

use std::time::SystemTime;

use crate::{PlayerId, PlayerProfile};

/// Result row of a ban-status lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanLookup {
    /// The authoritative ban flag. The gate only ever reads this.
    pub banned: bool,

    /// When the record's profile fields were last written, if the store
    /// tracks it. Drives the profile refresh policy; `None` counts as
    /// maximally stale.
    pub last_updated: Option<SystemTime>,
}

/// Identity a game server announces to the store.
///
/// The store keys servers by `key` and maintains a last-heartbeat marker
/// itself — the gate only re-announces, it never reads heartbeats back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Unique server key (typically provisioned out-of-band).
    pub key: String,
    /// Human-readable server name.
    pub name: String,
    /// Address players connect to.
    pub ip: String,
    /// Port players connect to.
    pub port: u16,
}

/// Errors from the relational store.
///
/// The gate treats every variant as transient: a store error never crashes
/// a pipeline, it only selects the fail-open or fail-closed branch.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached (connection refused, pool exhausted,
    /// network partition).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the operation failed (bad schema, syntax,
    /// constraint violation).
    #[error("store query failed: {0}")]
    Query(String),

    /// The operation did not complete within the configured deadline.
    #[error("store operation timed out")]
    Timeout,
}

/// The four relational-store operations the gate depends on.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` — implementations are shared across worker
///   tasks behind an `Arc` and must outlive any spawned pipeline.
///
/// # Concurrency
///
/// Implementations must tolerate concurrent calls for distinct player
/// identities; the gate serializes per-slot but never globally.
pub trait BanStore: Send + Sync + 'static {
    /// Looks up the ban record for a player.
    ///
    /// Returns `Ok(None)` when no record exists — a distinct outcome from
    /// an error, because "never seen before" feeds the insert-if-missing
    /// path while an error feeds the fail-open/fail-closed policy.
    fn lookup_ban(
        &self,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<Option<BanLookup>, StoreError>> + Send;

    /// Writes non-authoritative profile-display fields for a player.
    ///
    /// MUST NOT modify the ban flag or any role/authorization fields —
    /// only name, avatar URLs, profile URL, and the last-updated marker.
    fn upsert_profile(
        &self,
        profile: &PlayerProfile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Inserts a minimal record for a player if none exists.
    ///
    /// A no-op when the row is already present (in particular, it must not
    /// overwrite an existing name with the fallback).
    fn insert_if_missing(
        &self,
        player_id: &PlayerId,
        name_fallback: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Upserts the server's identity row and refreshes its heartbeat
    /// marker. Called once per heartbeat tick and on manual registration.
    fn upsert_server(
        &self,
        identity: &ServerIdentity,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
