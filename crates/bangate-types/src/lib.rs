//! Shared types and external-service contracts for Bangate.
//!
//! This crate defines the "language" the rest of the gate speaks:
//!
//! 1. **Identity types** — who a connecting player is ([`PlayerId`],
//!    [`SlotId`], [`PlayerSession`])
//! 2. **Store contract** — the four relational-store operations the gate
//!    consumes ([`BanStore`])
//! 3. **Profile contract** — the one external profile-service operation
//!    ([`ProfileService`])
//!
//! # How it fits in the stack
//!
//! ```text
//! bangate (plugin layer)      ← wires everything to the host runtime
//!     ↕
//! bangate-pipeline/-heartbeat ← the decision and scheduling logic
//!     ↕
//! bangate-types (this crate)  ← types + contracts, no I/O of its own
//! ```
//!
//! The store and profile service are deliberately traits, not
//! implementations: SQL execution and HTTP transport belong to the host
//! environment. Everything here compiles without touching a network.

mod ids;
mod profile;
mod session;
mod store;

pub use ids::{PlayerId, SlotId};
pub use profile::{PlayerProfile, ProfileError, ProfileService};
pub use session::{PlayerSession, SessionKind};
pub use store::{BanLookup, BanStore, ServerIdentity, StoreError};
