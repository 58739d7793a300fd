//! Front matter parsing.
//!
//! Pages may start with a metadata block in one of two comment styles:
//!
//! ```markdown
//! <!--
//! title: Guide
//! description: How it all works
//! -->
//! ```
//!
//! or the `/* ... */` equivalent. The block is only recognized at the very
//! start of the (trimmed) file, and the first closing delimiter wins.

use crate::error::Error;
use anyhow::Result;
use std::collections::BTreeMap;

const DELIMITERS: [(&str, &str); 2] = [("<!--", "-->"), ("/*", "*/")];

/// Parse the leading metadata block into key/value pairs.
///
/// Returns an empty map when there is no block. An opening delimiter with no
/// matching close is an [`Error::MetadataParse`]; callers indexing in bulk are
/// expected to isolate that failure per file rather than abort the batch.
pub fn parse_meta(text: &str) -> Result<BTreeMap<String, String>> {
    let trimmed = text.trim_start();

    let Some((opening, closing)) = leading_delimiter(trimmed) else {
        return Ok(BTreeMap::new());
    };

    let inner = &trimmed[opening.len()..];
    let Some(end) = inner.find(closing) else {
        return Err(Error::MetadataParse { opening, closing }.into());
    };

    Ok(parse_pairs(&inner[..end]))
}

/// Return the document body with the leading metadata block removed.
///
/// Unlike [`parse_meta`] this degrades on a malformed block: render paths must
/// not hard-fail on a file the indexer already reported, so an unterminated
/// block leaves the text unchanged.
pub fn strip_front_matter(text: &str) -> &str {
    let trimmed = text.trim_start();

    let Some((opening, closing)) = leading_delimiter(trimmed) else {
        return trimmed;
    };

    match trimmed[opening.len()..].find(closing) {
        Some(end) => &trimmed[opening.len() + end + closing.len()..],
        None => trimmed,
    }
}

fn leading_delimiter(trimmed: &str) -> Option<(&'static str, &'static str)> {
    DELIMITERS
        .iter()
        .copied()
        .find(|(opening, _)| trimmed.starts_with(opening))
}

fn parse_pairs(block: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    for line in block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                pairs.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    pairs
}
