//! Keep player-supplied text on one log line.
//!
//! Names, chat and command lines come straight off the socket, so they are
//! escaped before they reach the log and capped in length.

use std::fmt::Write;

/// Longest preview kept from a single value.
pub const MAX_LOG_PREVIEW: usize = 200;

/// Escape a string for single-line logging. Backslash and `\n`, `\r`, `\t`
/// get their usual escapes, other control characters become `\xNN`, and the
/// result is cut at [`MAX_LOG_PREVIEW`] characters with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOG_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count == MAX_LOG_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
