//! URL-safe slugs for heading anchors.

use regex::Regex;
use std::sync::OnceLock;

static COLLAPSE: OnceLock<Regex> = OnceLock::new();

/// Convert text to a URL-safe slug.
///
/// Transliterates to ASCII, lowercases, maps everything that is not
/// alphanumeric to a hyphen, collapses runs of hyphens and trims them from
/// both ends.
pub fn slugify(input: &str) -> String {
    let ascii = deunicode::deunicode(input).to_lowercase();

    let hyphenated: String = ascii
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let re = COLLAPSE.get_or_init(|| Regex::new(r"-+").unwrap());
    re.replace_all(&hyphenated, "-")
        .trim_matches('-')
        .to_string()
}
