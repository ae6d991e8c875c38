//! Unified error type for the Bangate plugin.

use bangate_types::{ProfileError, StoreError};

use crate::commands::CommandError;

/// Top-level error that wraps all crate-specific errors.
///
/// Host integrations deal with this single type; the `#[from]` attribute
/// on each variant lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BangateError {
    /// A relational-store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A profile-service error.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// An administrative-command error.
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("gone".into());
        let gate_err: BangateError = err.into();
        assert!(matches!(gate_err, BangateError::Store(_)));
        assert!(gate_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_profile_error() {
        let err = ProfileError::Timeout;
        let gate_err: BangateError = err.into();
        assert!(matches!(gate_err, BangateError::Profile(_)));
    }

    #[test]
    fn test_from_command_error() {
        let err = CommandError::ConsoleOnly;
        let gate_err: BangateError = err.into();
        assert!(matches!(gate_err, BangateError::Command(_)));
        assert!(gate_err.to_string().contains("console"));
    }
}
