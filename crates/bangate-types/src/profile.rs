//! The external profile-service contract.
//!
//! One operation: fetch a player's public profile by id. The transport
//! (HTTP, rate limiting, API key plumbing) is the implementation's concern;
//! the gate only decides WHEN to fetch and what to persist.

use crate::PlayerId;

/// Non-authoritative display fields fetched from the profile service.
///
/// "Non-authoritative" is load-bearing: these fields are cosmetic and may
/// be overwritten on every refresh, unlike the ban flag, which the gate
/// never writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    /// The identity this profile belongs to.
    ///
    /// Callers persisting a fetched profile MUST overwrite this with the
    /// id they queried for — a transport-level mixup (proxy cache, batched
    /// response mismatch) must never attach one player's profile to
    /// another player's record.
    pub player_id: PlayerId,
    /// Current display name.
    pub name: String,
    /// Small avatar image URL.
    pub avatar_url: String,
    /// Medium avatar image URL.
    pub avatar_medium_url: String,
    /// Full-size avatar image URL.
    pub avatar_full_url: String,
    /// Public profile page URL.
    pub profile_url: String,
}

impl PlayerProfile {
    /// Returns the profile with its identity forced to `player_id`.
    ///
    /// Guard against transport-level id mismatches: whatever identity the
    /// service reported is discarded in favor of the id that was queried.
    pub fn with_identity(mut self, player_id: PlayerId) -> Self {
        self.player_id = player_id;
        self
    }
}

/// Errors from the profile service.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The service could not be reached or returned a transport error.
    #[error("profile service unreachable: {0}")]
    Transport(String),

    /// The service rejected the request (bad API key, quota).
    #[error("profile service rejected request: {0}")]
    Rejected(String),

    /// The fetch did not complete within the configured deadline.
    #[error("profile fetch timed out")]
    Timeout,
}

/// Fetches a player's public profile.
pub trait ProfileService: Send + Sync + 'static {
    /// Fetches the profile for `player_id`, or `Ok(None)` when the service
    /// has no such player.
    ///
    /// The returned profile's reported identity is untrusted — see
    /// [`PlayerProfile::with_identity`].
    fn fetch_profile(
        &self,
        api_key: &str,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<Option<PlayerProfile>, ProfileError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_identity_overrides_reported_id() {
        let fetched = PlayerProfile {
            player_id: PlayerId::from("service-reported-id"),
            name: "Alice".into(),
            avatar_url: "https://a/s.jpg".into(),
            avatar_medium_url: "https://a/m.jpg".into(),
            avatar_full_url: "https://a/f.jpg".into(),
            profile_url: "https://a/p".into(),
        };

        let pinned = fetched.with_identity(PlayerId::from("queried-id"));

        assert_eq!(pinned.player_id, PlayerId::from("queried-id"));
        assert_eq!(pinned.name, "Alice");
    }
}
