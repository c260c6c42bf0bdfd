//! Query and field normalization.
//!
//! Lower-cases, turns every character that is not a letter, digit, or
//! whitespace into a space, and splits on whitespace.

use std::sync::LazyLock;

use regex::Regex;

/// Tokenize a string into normalized, non-empty tokens (order preserved).
pub fn normalize(input: &str) -> Vec<String> {
    static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex")
    });

    let lowered = input.to_lowercase();
    NON_WORD_RE
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Normalize each entry of a multi-valued field and flatten the tokens.
///
/// A two-word tag yields two tokens, each matched on its own.
pub fn normalize_all<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| normalize(v.as_ref()))
        .collect()
}
