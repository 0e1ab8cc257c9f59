//! Post-processing of search and ask answers.

use std::sync::LazyLock;

use regex::Regex;

/// Citation markers such as `[1]` and the spaces before them.
static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\[\d+\]").expect("citation pattern is valid"));

/// Runs of spaces or tabs after a non-space character.
static INNER_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S)[ \t]{2,}").expect("whitespace pattern is valid"));

/// Strip citation markers and collapse inner whitespace runs.
///
/// Line breaks and leading indentation are kept, so lists and code blocks
/// still render as markdown.
pub fn clean_answer(text: &str) -> String {
    let stripped = CITATION.replace_all(text, "");
    INNER_SPACES.replace_all(&stripped, "$1 ").trim().to_string()
}
