//! Splitting a command line into words and expanding `$NAME` references.

use crate::env::Environment;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static VAR_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z0-9_]+)").unwrap());

/// Splits `line` on spaces and tabs, dropping empty words.
pub fn split_into_tokens(line: &str) -> Vec<&str> {
    line.split([' ', '\t'])
        .filter(|token| !token.is_empty())
        .collect()
}

/// Replaces each `$NAME` in `word` with its value, or with nothing when the
/// variable is unset. A `$` not followed by a name character stays as is.
pub fn expand_vars(word: &str, env: &Environment) -> String {
    VAR_REFERENCE
        .replace_all(word, |caps: &Captures| env.get_var(&caps[1]).unwrap_or_default())
        .into_owned()
}

/// Tokenizes `line` and expands every word independently, so a value with
/// spaces stays a single argument.
pub fn expand_line(line: &str, env: &Environment) -> Vec<String> {
    split_into_tokens(line)
        .into_iter()
        .map(|token| expand_vars(token, env))
        .collect()
}
