//! Bounded `$NAME` / `${NAME}` expansion over a string mapping.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Substitution budget for a single expansion.
pub const DEFAULT_MAX_SUBSTITUTIONS: usize = 50;

/// Expand with the default substitution budget.
pub fn expand(template: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    expand_with_limit(template, vars, DEFAULT_MAX_SUBSTITUTIONS)
}

/// Expand `$NAME` and `${NAME}` tokens from `vars`.
///
/// Tokens whose name is absent from `vars` are left verbatim. Substituted
/// text is rescanned, so a value may reference further variables; `limit`
/// bounds the total number of substitution attempts across the whole
/// expansion, and exhausting it is an [`Error::ExpansionLimit`]. Without the
/// bound, self- or mutually-referential variables would expand forever.
pub fn expand_with_limit(
    template: &str,
    vars: &BTreeMap<String, String>,
    limit: usize,
) -> Result<String> {
    if !template.contains('$') {
        return Ok(template.to_string());
    }

    let mut out = template.to_string();
    let mut pos = 0;
    let mut attempts = 0;

    while let Some(token) = next_token(&out, pos) {
        attempts += 1;
        if attempts > limit {
            return Err(Error::ExpansionLimit { limit });
        }
        let replacement = vars.get(&out[token.name_start..token.name_end]).cloned();
        match replacement {
            None => pos = token.end,
            Some(value) => {
                out.replace_range(token.start..token.end, &value);
                // rescan from the start of the inserted value
                pos = token.start;
            }
        }
    }
    Ok(out)
}

struct Token {
    start: usize,
    end: usize,
    name_start: usize,
    name_end: usize,
}

/// Find the next `$NAME` or `${NAME}` at or after byte offset `from`.
fn next_token(s: &str, from: usize) -> Option<Token> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'{') {
            if let Some(close) = s[i + 2..].find('}') {
                return Some(Token {
                    start: i,
                    end: i + close + 3,
                    name_start: i + 2,
                    name_end: i + 2 + close,
                });
            }
            // unterminated brace, not a token
            i += 2;
        } else {
            let name_start = i + 1;
            let mut j = name_start;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > name_start {
                return Some(Token {
                    start: i,
                    end: j,
                    name_start,
                    name_end: j,
                });
            }
            i += 1;
        }
    }
    None
}
