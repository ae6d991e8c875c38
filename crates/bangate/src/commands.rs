//! Administrative command surface.
//!
//! Two commands, both console-only: `reload` (re-apply settings, rebuild
//! cache and heartbeat) and `register <server-key>` (persist a new key and
//! re-announce immediately). Parsing lives here; execution lives on
//! [`BangatePlugin`](crate::BangatePlugin).

use bangate_types::SlotId;

/// Who invoked a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    /// The server console / terminal.
    Console,
    /// An in-game actor. Administrative commands are refused for these —
    /// a compromised in-game admin account must not be able to re-point
    /// the server's registration.
    Player(SlotId),
}

/// A parsed administrative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Re-apply settings: rebuild the cache with the new TTL and restart
    /// the heartbeat with the new interval.
    Reload,
    /// Persist a new server key and trigger an immediate registration.
    Register {
        /// The new server key.
        server_key: String,
    },
}

/// Errors from parsing or executing an administrative command.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command was invoked by an in-game actor.
    #[error("this command may only be run from the console")]
    ConsoleOnly,

    /// The command name is not recognized.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// Wrong number or shape of arguments.
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parses a command name and its argument slice.
    pub fn parse(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        match name {
            "reload" => {
                if args.is_empty() {
                    Ok(Self::Reload)
                } else {
                    Err(CommandError::Usage("reload"))
                }
            }
            "register" => match args {
                [key] if !key.is_empty() => Ok(Self::Register {
                    server_key: (*key).to_string(),
                }),
                _ => Err(CommandError::Usage("register <server-key>")),
            },
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reload() {
        assert_eq!(Command::parse("reload", &[]), Ok(Command::Reload));
    }

    #[test]
    fn test_parse_reload_rejects_arguments() {
        assert_eq!(
            Command::parse("reload", &["now"]),
            Err(CommandError::Usage("reload"))
        );
    }

    #[test]
    fn test_parse_register_with_key() {
        assert_eq!(
            Command::parse("register", &["srv-7"]),
            Ok(Command::Register {
                server_key: "srv-7".into()
            })
        );
    }

    #[test]
    fn test_parse_register_requires_exactly_one_arg() {
        assert!(matches!(
            Command::parse("register", &[]),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            Command::parse("register", &["a", "b"]),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            Command::parse("register", &[""]),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            Command::parse("banhammer", &[]),
            Err(CommandError::Unknown("banhammer".into()))
        );
    }
}
