//! The host decision queue: how verdicts cross back to the host thread.
//!
//! The kick primitive — and the session re-validation it requires — is
//! only safe on the host's own thread. Worker tasks therefore never kick
//! directly: they push a [`HostAction`] onto an unbounded channel, and the
//! host drains the channel once per tick via [`HostInbox::drain`].

use bangate_types::{PlayerId, SlotId};
use tokio::sync::mpsc;

/// A deferred action for the host thread to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Disconnect a player with a (pre-sanitized) reason.
    Kick {
        /// Slot to kick. May have been reused since the verdict was made.
        slot: SlotId,
        /// The identity the verdict was made for. Liveness re-validation
        /// compares this against whoever occupies the slot now.
        player_id: PlayerId,
        /// Reason shown to the player.
        reason: String,
    },
}

/// Host-thread operations the gate needs.
///
/// Implemented by the host integration layer. Both methods are only ever
/// called from the host thread, during [`HostInbox::drain`], so the trait
/// carries no `Send`/`Sync` bounds.
pub trait HostApi {
    /// Whether `slot` is still connected, still carries `player_id`, and
    /// is not a bot. Verdicts that fail this check are dropped.
    fn session_live(&self, slot: SlotId, player_id: &PlayerId) -> bool;

    /// The host kick primitive.
    fn kick(&self, slot: SlotId, reason: &str);
}

/// Sender half: cloned into every pipeline task.
#[derive(Debug, Clone)]
pub struct HostQueue {
    tx: mpsc::UnboundedSender<HostAction>,
}

impl HostQueue {
    /// Queues an action for the next host tick. If the inbox is gone
    /// (plugin unloading) the action is silently dropped — exactly the
    /// behavior shutdown wants.
    pub fn push(&self, action: HostAction) {
        if self.tx.send(action).is_err() {
            tracing::debug!("host inbox closed, action dropped");
        }
    }
}

/// Receiver half: owned by the plugin, drained on the host tick.
#[derive(Debug)]
pub struct HostInbox {
    rx: mpsc::UnboundedReceiver<HostAction>,
}

impl HostInbox {
    /// Drains all queued actions, re-validating each against the live
    /// host state before execution. Returns how many were executed.
    ///
    /// Must be called from the host thread. Never blocks: `try_recv` only.
    pub fn drain(&mut self, host: &impl HostApi) -> usize {
        let mut executed = 0;
        while let Ok(action) = self.rx.try_recv() {
            match action {
                HostAction::Kick {
                    slot,
                    player_id,
                    reason,
                } => {
                    if host.session_live(slot, &player_id) {
                        host.kick(slot, &reason);
                        executed += 1;
                    } else {
                        tracing::debug!(
                            %slot,
                            %player_id,
                            "kick dropped: session no longer live"
                        );
                    }
                }
            }
        }
        executed
    }
}

/// Creates a connected queue/inbox pair.
pub fn host_channel() -> (HostQueue, HostInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HostQueue { tx }, HostInbox { rx })
}
