//! Kick-reason hygiene.
//!
//! The host executes kicks through a quoted command line, so a reason
//! string containing double quotes (or unbounded length) can break the
//! command or flood the wire. Every reason — configured or generated —
//! passes through here before dispatch.

/// Hard upper bound on a kick reason, in characters.
pub const MAX_KICK_REASON_CHARS: usize = 120;

/// Makes a kick reason safe for the host command line: embedded double
/// quotes become single quotes, surrounding whitespace is trimmed, and the
/// result is hard-truncated to [`MAX_KICK_REASON_CHARS`] characters.
pub fn sanitize_kick_reason(raw: &str) -> String {
    let quoted = raw.replace('"', "'");
    quoted.trim().chars().take(MAX_KICK_REASON_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_double_quotes() {
        assert_eq!(sanitize_kick_reason(r#"He said "hi""#), "He said 'hi'");
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize_kick_reason("  banned  "), "banned");
    }

    #[test]
    fn test_sanitize_truncates_to_120_chars() {
        let long = "x".repeat(300);
        let out = sanitize_kick_reason(&long);
        assert_eq!(out.chars().count(), MAX_KICK_REASON_CHARS);
    }

    #[test]
    fn test_sanitize_quotes_trim_and_truncate_together() {
        let input = format!(r#"He said "hi" {}"#, "f".repeat(130));
        let out = sanitize_kick_reason(&input);

        assert!(out.starts_with("He said 'hi'"));
        assert!(!out.contains('"'));
        assert_eq!(out.chars().count(), 120);
    }

    #[test]
    fn test_sanitize_short_reason_unchanged() {
        assert_eq!(sanitize_kick_reason("You are banned."), "You are banned.");
    }

    #[test]
    fn test_sanitize_counts_chars_not_bytes() {
        // Multi-byte characters must not be split mid-codepoint.
        let long = "ø".repeat(200);
        let out = sanitize_kick_reason(&long);
        assert_eq!(out.chars().count(), 120);
    }
}
