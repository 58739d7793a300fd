//! Snippet expansion.
//!
//! Substitutes configured placeholder tokens with their snippet bodies before
//! Markdown parsing, so expanded content takes part in block and inline
//! parsing. Expansion is a single left-to-right pass: inserted bodies are
//! never re-scanned, which bounds the runtime no matter what the snippet
//! table contains.

use std::collections::BTreeMap;

/// Expand every recognized `<open>name<close>` placeholder in `text`.
///
/// Unrecognized names are kept verbatim, delimiters included. An opening
/// token with no closing token is also kept verbatim.
pub fn expand(
    text: &str,
    snippets: &BTreeMap<String, String>,
    open: &str,
    close: &str,
) -> String {
    if open.is_empty() || close.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        out.push_str(&rest[..start]);
        let after = &rest[start + open.len()..];

        match after.find(close) {
            Some(end) => {
                let name = &after[..end];
                match snippets.get(name.trim()) {
                    Some(body) => out.push_str(body),
                    None => {
                        out.push_str(open);
                        out.push_str(name);
                        out.push_str(close);
                    }
                }
                rest = &after[end + close.len()..];
            }
            None => {
                out.push_str(open);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
