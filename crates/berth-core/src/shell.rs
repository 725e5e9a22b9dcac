//! Shell quoting for generated `/bin/sh` scripts.

/// Quote `s` for safe interpolation into a POSIX shell script.
///
/// Strings made of unambiguous characters pass through untouched; everything
/// else is wrapped in single quotes, with embedded single quotes rendered as
/// `'\''`. Applied to every user-controlled value that lands in a script.
pub fn quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_safe) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}
