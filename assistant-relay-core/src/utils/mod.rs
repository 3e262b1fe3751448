//! Utility functions and helpers

/// The first `max_chars` characters of `s`, cut on a char boundary
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Mask a secret for display, keeping only its length visible
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        format!("(set, {} chars)", secret.chars().count())
    }
}
