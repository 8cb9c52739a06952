//! Smol utilities for logging

use std::ascii;

/// Longest run of bytes `ascii_escape` renders before eliding the rest
pub const MAX_LOGGED_BYTES: usize = 512;

/// Make an Ascii-safe string out of responder bytes
///
/// Anything past `MAX_LOGGED_BYTES` is replaced by a count of what was
/// left out, so a chatty stderr stream doesn't flood the log.
pub fn ascii_escape(s: &[u8]) -> String {
    let shown = &s[.. s.len().min(MAX_LOGGED_BYTES)];
    let mut escaped: String = shown.iter()
        .flat_map(|&b| ascii::escape_default(b))
        .map(char::from)
        .collect();

    if s.len() > shown.len() {
        escaped.push_str(&format!("... ({} more bytes)", s.len() - shown.len()));
    }

    escaped
}

#[test]
fn escapes_control_bytes() {
    assert_eq!(ascii_escape(b"a\nb\x00"), "a\\nb\\x00");
}

#[test]
fn elides_long_input() {
    let input = vec![b'x'; MAX_LOGGED_BYTES + 3];
    let escaped = ascii_escape(&input);

    assert!(escaped.ends_with("... (3 more bytes)"));
    assert!(escaped.starts_with("xxx"));
}
