//! The ban decision pipeline: the heart of the gate.
//!
//! Turns a synchronous "player joined" event into an asynchronous
//! lookup-cache-decide-act sequence:
//!
//! ```text
//! host join event
//!     │  (guard admits — at most one pipeline per slot)
//!     ▼
//! CacheCheck ──hit──→ decide (banned? queue kick : allow)
//!     │ miss
//!     ▼
//! StoreLookup ──→ cache verdict ──→ decide ──→ maybe refresh profile
//!     │
//!     ▼
//! decision queued onto the host inbox, drained once per host tick
//!     │
//!     ▼
//! guard released (guaranteed, every exit path)
//! ```
//!
//! The kick primitive is only safe on the host's own thread, so the
//! pipeline never calls it directly: verdicts travel through
//! [`HostQueue`]/[`HostInbox`] and are re-validated against the live host
//! state right before execution.

mod host;
mod pipeline;
mod reason;
mod refresh;

pub use host::{HostAction, HostApi, HostInbox, HostQueue, host_channel};
pub use pipeline::{
    AllowSource, JoinOutcome, KickSource, NoProfileService, Pipeline,
    PipelineConfig,
};
pub use reason::{MAX_KICK_REASON_CHARS, sanitize_kick_reason};
pub use refresh::{should_refresh, should_refresh_at};
