//! Session types: the data the gate sees when a player joins.
//!
//! A [`PlayerSession`] is a snapshot taken on the host's join event. It is
//! transient — owned by exactly one decision pipeline run and never
//! persisted. The authoritative connection state stays with the host; the
//! snapshot only exists so the worker task can run without touching host
//! APIs.

use crate::{PlayerId, SlotId};

/// What kind of actor occupies a slot.
///
/// Only real players go through the ban gate. Bots and spectators are
/// host-managed pseudo-connections with no stable external identity, so the
/// gate excludes them before any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// A real, remotely-connected player.
    Player,
    /// A server-controlled bot.
    Bot,
    /// A spectator connection (observes, never plays).
    Spectator,
}

/// A connected player's transient identity for the duration of one
/// connection.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// The host-assigned connection slot. Reused across sessions.
    pub slot: SlotId,

    /// Stable external identity. `None` when the host could not resolve
    /// one (LAN clients, malformed handshakes) — such sessions are never
    /// eligible for a ban decision.
    pub player_id: Option<PlayerId>,

    /// Display name as reported at join time. Used only as a fallback when
    /// inserting a brand-new store record.
    pub display_name: String,

    /// Player, bot, or spectator.
    pub kind: SessionKind,
}

impl PlayerSession {
    /// Whether this session qualifies for a ban decision at all.
    ///
    /// Bots and spectators are excluded, as is any session without a
    /// stable identity. Ineligible sessions are allowed through without
    /// any cache or store access.
    pub fn is_eligible(&self) -> bool {
        self.kind == SessionKind::Player && self.player_id.is_some()
    }
}
