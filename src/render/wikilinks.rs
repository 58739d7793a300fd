//! Wikilink resolution against the page index.
//!
//! `[[target]]` links to the indexed page whose `url` equals `target`, with
//! the record's stored title as the visible text. `[[target|display]]` keeps
//! the link but uses the explicit display text, honoring any inline Markdown
//! formatting inside it. An unresolved target degrades to the literal
//! `[[...]]` text; an unterminated `[[` is emitted as-is and scanning moves
//! on.
//!
//! pulldown-cmark may split one source line into several `Text` events, and
//! inline formatting inside the delimiters turns into its own events, so
//! scanning works across the event stream: consecutive text runs are merged
//! and inline events between `[[` and `]]` are buffered, then re-emitted as
//! the link body. Code blocks and inline code are never scanned.

use crate::store::PageLookup;
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

pub struct WikilinkResolver<'r> {
    lookup: &'r dyn PageLookup,
    base_url: &'r str,
}

/// An open `[[` whose `]]` has not been seen yet.
///
/// `head` is the raw text that followed the delimiter in the opening run,
/// `body` the inline events buffered since, `tail` the text preceding the
/// closing delimiter.
struct Capture<'a> {
    head: String,
    body: Vec<Event<'a>>,
    tail: String,
}

impl Capture<'_> {
    fn plain_text(&self) -> String {
        let mut text = self.head.clone();
        for event in &self.body {
            match event {
                Event::Text(t) => text.push_str(t),
                Event::Code(c) => text.push_str(c),
                _ => {}
            }
        }
        text.push_str(&self.tail);
        text
    }
}

impl<'r> WikilinkResolver<'r> {
    pub fn new(lookup: &'r dyn PageLookup, base_url: &'r str) -> Self {
        Self { lookup, base_url }
    }

    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::new();
        let mut in_code_block = false;
        let mut capture: Option<Capture<'a>> = None;
        let mut iter = events.into_iter().peekable();

        while let Some(event) = iter.next() {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    self.flush(&mut capture, &mut result);
                    in_code_block = true;
                    result.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    result.push(event);
                }
                Event::Text(text) if !in_code_block => {
                    let mut merged = text.into_string();
                    while let Some(Event::Text(next)) = iter.peek() {
                        merged.push_str(next);
                        iter.next();
                    }
                    self.scan(&merged, &mut capture, &mut result);
                }
                other => match capture.as_mut() {
                    Some(open) if is_inline(&other) => open.body.push(other),
                    _ => {
                        // Block boundaries end the scanning pass.
                        self.flush(&mut capture, &mut result);
                        result.push(other);
                    }
                },
            }
        }
        self.flush(&mut capture, &mut result);

        result
    }

    fn scan<'a>(&self, text: &str, capture: &mut Option<Capture<'a>>, out: &mut Vec<Event<'a>>) {
        let mut remaining = text;

        if let Some(mut open) = capture.take() {
            match remaining.find("]]") {
                Some(end) => {
                    open.tail = remaining[..end].to_string();
                    self.finish(open, out);
                    remaining = &remaining[end + 2..];
                }
                None => {
                    open.body.push(Event::Text(CowStr::from(remaining.to_string())));
                    *capture = Some(open);
                    return;
                }
            }
        }

        while let Some(start) = remaining.find("[[") {
            if start > 0 {
                out.push(Event::Text(CowStr::from(remaining[..start].to_string())));
            }
            let after_open = &remaining[start + 2..];

            match after_open.find("]]") {
                Some(end) => {
                    self.emit_link(&after_open[..end], out);
                    remaining = &after_open[end + 2..];
                }
                None => {
                    // The close may arrive in a later event; start capturing.
                    *capture = Some(Capture {
                        head: after_open.to_string(),
                        body: Vec::new(),
                        tail: String::new(),
                    });
                    return;
                }
            }
        }

        if !remaining.is_empty() {
            out.push(Event::Text(CowStr::from(remaining.to_string())));
        }
    }

    /// Whole wikilink arrived in one text run; the display text is plain.
    fn emit_link<'a>(&self, inner: &str, out: &mut Vec<Event<'a>>) {
        let (key, explicit_title) = match inner.split_once('|') {
            Some((key, title)) => (key.trim(), Some(title.trim())),
            None => (inner.trim(), None),
        };

        let Some(page) = self.lookup.find_by_url(key) else {
            out.push(Event::Text(CowStr::from(format!("[[{}]]", inner))));
            return;
        };

        self.push_link_start(&page.url, out);
        let title = match explicit_title {
            Some(title) => title.to_string(),
            None => page.title.clone().unwrap_or_else(|| page.url.clone()),
        };
        out.push(Event::Text(CowStr::from(title)));
        out.push(Event::End(TagEnd::Link));
    }

    /// A capture closed across events; formatted display text is re-emitted
    /// as the link body.
    fn finish<'a>(&self, open: Capture<'a>, out: &mut Vec<Event<'a>>) {
        match open.head.split_once('|') {
            Some((key, title_head)) => {
                let key = key.trim();
                let Some(page) = self.lookup.find_by_url(key) else {
                    self.literal(open, out);
                    return;
                };
                self.push_link_start(&page.url, out);
                let lead = title_head.trim_start();
                if !lead.is_empty() {
                    out.push(Event::Text(CowStr::from(lead.to_string())));
                }
                out.extend(open.body);
                let trail = open.tail.trim_end();
                if !trail.is_empty() {
                    out.push(Event::Text(CowStr::from(trail.to_string())));
                }
                out.push(Event::End(TagEnd::Link));
            }
            None => {
                let plain = open.plain_text();
                match self.lookup.find_by_url(plain.trim()) {
                    Some(page) => {
                        self.push_link_start(&page.url, out);
                        let title = page.title.clone().unwrap_or_else(|| page.url.clone());
                        out.push(Event::Text(CowStr::from(title)));
                        out.push(Event::End(TagEnd::Link));
                    }
                    None => self.literal(open, out),
                }
            }
        }
    }

    fn push_link_start<'a>(&self, url: &str, out: &mut Vec<Event<'a>>) {
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url: CowStr::from(format!("{}{}", self.base_url, url)),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
    }

    /// Unresolved capture: the delimiters and everything between them come
    /// back out unchanged.
    fn literal<'a>(&self, open: Capture<'a>, out: &mut Vec<Event<'a>>) {
        out.push(Event::Text(CowStr::from(format!("[[{}", open.head))));
        out.extend(open.body);
        out.push(Event::Text(CowStr::from(format!("{}]]", open.tail))));
    }

    /// Unterminated capture: the delimiter stays literal, the rest renders
    /// as ordinary content.
    fn flush<'a>(&self, capture: &mut Option<Capture<'a>>, out: &mut Vec<Event<'a>>) {
        if let Some(open) = capture.take() {
            out.push(Event::Text(CowStr::from(format!("[[{}", open.head))));
            out.extend(open.body);
        }
    }
}

/// Events a wikilink capture may span. Breaks and block structure end it.
fn is_inline(event: &Event<'_>) -> bool {
    matches!(
        event,
        Event::Code(_)
            | Event::InlineHtml(_)
            | Event::FootnoteReference(_)
            | Event::Start(
                Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
            )
            | Event::End(
                TagEnd::Emphasis
                    | TagEnd::Strong
                    | TagEnd::Strikethrough
                    | TagEnd::Link
                    | TagEnd::Image
            )
    )
}
