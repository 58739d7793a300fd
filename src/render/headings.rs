//! Heading anchors and document outline.
//!
//! Every heading gets a deterministic, URL-safe `id` and a trailing anchor
//! link. Authors can pin an id by embedding an empty anchor marker such as
//! `<span id="my-anchor"></span>` in the heading text; the marker's id wins
//! and the marker itself is stripped from the visible content.
//!
//! The outline only records level-2 headings at the top level. Deeper
//! headings attach under the most recent level-2 entry; with no level-2
//! entry yet they are dropped, not promoted. Level-1 headings never appear.

use crate::render::slug::slugify;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub title: String,
    pub id: String,
    pub children: Vec<Heading>,
}

fn anchor_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<(?:a|span)\s+id="([^"]+)"\s*>\s*</(?:a|span)>"#).unwrap())
}

/// Rewrite heading events and collect the outline.
pub fn transform<'a>(events: Vec<Event<'a>>) -> (Vec<Event<'a>>, Vec<Heading>) {
    let mut result = Vec::new();
    let mut outline: Vec<Heading> = Vec::new();

    let mut current: Option<(Tag<'a>, Vec<Event<'a>>)> = None;

    for event in events {
        match event {
            Event::Start(tag @ Tag::Heading { .. }) => {
                current = Some((tag, Vec::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some((tag, inner)) = current.take() else {
                    continue;
                };
                let Tag::Heading {
                    level,
                    classes,
                    attrs,
                    ..
                } = tag
                else {
                    unreachable!()
                };

                let (inner, pinned) = strip_anchor_marker(inner);
                let text = plain_text(&inner);
                let id = pinned.unwrap_or_else(|| slugify(&text));

                record(&mut outline, level, &text, &id);

                result.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(CowStr::from(id.clone())),
                    classes,
                    attrs,
                }));
                result.extend(inner);
                result.push(Event::Html(CowStr::from(anchor_link(&id))));
                result.push(Event::End(TagEnd::Heading(level)));
            }
            other => match &mut current {
                Some((_, inner)) => inner.push(other),
                None => result.push(other),
            },
        }
    }

    (result, outline)
}

fn record(outline: &mut Vec<Heading>, level: HeadingLevel, text: &str, id: &str) {
    let heading = Heading {
        title: text.to_string(),
        id: id.to_string(),
        children: Vec::new(),
    };
    match level {
        HeadingLevel::H1 => {}
        HeadingLevel::H2 => outline.push(heading),
        _ => {
            if let Some(last) = outline.last_mut() {
                last.children.push(heading);
            }
        }
    }
}

/// Pull a pinned id out of inline HTML, removing the marker from the events.
fn strip_anchor_marker<'a>(inner: Vec<Event<'a>>) -> (Vec<Event<'a>>, Option<String>) {
    // pulldown-cmark emits `<span id="...">` and `</span>` as two separate
    // inline HTML events; join adjacent runs so the empty marker element can
    // be matched as one string.
    let mut joined: Vec<Event<'a>> = Vec::with_capacity(inner.len());
    for event in inner {
        if let Event::InlineHtml(next) = &event {
            if let Some(Event::InlineHtml(prev)) = joined.last_mut() {
                *prev = CowStr::from(format!("{}{}", prev, next));
                continue;
            }
        }
        joined.push(event);
    }

    let mut pinned = None;
    let mut kept = Vec::with_capacity(joined.len());

    for event in joined {
        match event {
            Event::InlineHtml(html) | Event::Html(html) if pinned.is_none() => {
                if let Some(caps) = anchor_marker_re().captures(&html) {
                    pinned = Some(caps[1].to_string());
                    let stripped = anchor_marker_re().replace(&html, "").into_owned();
                    if !stripped.is_empty() {
                        kept.push(Event::InlineHtml(CowStr::from(stripped)));
                    }
                } else {
                    kept.push(Event::InlineHtml(html));
                }
            }
            other => kept.push(other),
        }
    }

    (kept, pinned)
}

/// Visible text of a heading, tags stripped.
fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) => text.push_str(t),
            Event::Code(c) => text.push_str(c),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text.trim().to_string()
}

fn anchor_link(id: &str) -> String {
    format!(
        "<a aria-label=\"Anchor link for: {id}\" href=\"#{id}\" class=\"anchor-link\"><i class=\"fa fa-link\"></i></a>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{html::push_html, Options, Parser};

    fn render(input: &str) -> (String, Vec<Heading>) {
        let events: Vec<Event> = Parser::new_ext(input, Options::empty()).collect();
        let (events, outline) = transform(events);
        let mut html = String::new();
        push_html(&mut html, events.into_iter());
        (html, outline)
    }

    #[test]
    fn test_heading_gets_slug_id_and_anchor_link() {
        let (html, _) = render("## Hello World\n");
        assert!(html.contains("<h2 id=\"hello-world\">"));
        assert!(html.contains("href=\"#hello-world\""));
        assert!(html.contains("class=\"anchor-link\""));
        assert!(html.contains("aria-label=\"Anchor link for: hello-world\""));
    }

    #[test]
    fn test_explicit_anchor_marker_wins() {
        let (html, outline) = render("## Setup <span id=\"install\"></span>\n");
        assert!(html.contains("<h2 id=\"install\">"));
        assert!(!html.contains("<span id=\"install\"></span>"));
        assert_eq!(outline[0].id, "install");
        assert_eq!(outline[0].title, "Setup");
    }

    #[test]
    fn test_anchor_marker_before_text() {
        let (html, outline) = render("## <span id=\"pin\"></span>Weird placement\n");
        assert!(html.contains("<h2 id=\"pin\">"));
        assert!(!html.contains("span id"));
        assert_eq!(outline[0].title, "Weird placement");
    }

    #[test]
    fn test_outline_levels() {
        let (_, outline) = render("# Title\n\n## One\n\n### One A\n\n## Two\n");
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "One");
        assert_eq!(outline[0].children.len(), 1);
        assert_eq!(outline[0].children[0].title, "One A");
        assert_eq!(outline[1].title, "Two");
        assert!(outline[1].children.is_empty());
    }

    #[test]
    fn test_deep_heading_without_parent_is_dropped() {
        let (html, outline) = render("### Orphan\n");
        assert!(outline.is_empty());
        // The heading itself still renders with its anchor.
        assert!(html.contains("<h3 id=\"orphan\">"));
    }

    #[test]
    fn test_formatted_heading_slug_uses_plain_text() {
        let (html, _) = render("## Using `cargo` *well*\n");
        assert!(html.contains("<h2 id=\"using-cargo-well\">"));
    }
}
