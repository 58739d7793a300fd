//! Extended Markdown rendering.
//!
//! The dialect on top of baseline Markdown: snippets, wikilinks resolved
//! against the page index, images with probed dimensions, headings with
//! anchors, highlighted code blocks and an optional table of contents.
//!
//! Each transformer is a pass over the pulldown-cmark event stream; the
//! pipeline wires them in a fixed order and splices the TOC into the
//! final HTML.

pub mod headings;
pub mod highlight;
pub mod images;
pub mod slug;
pub mod wikilinks;

pub use headings::Heading;

use crate::config::AppConfig;
use crate::core::{meta, snippets};
use crate::error::Error;
use crate::store::{Page, PageLookup};
use anyhow::{Context, Result};
use pulldown_cmark::{html::push_html, Event, Options, Parser};

// Private-use sentinels standing in for escaped wikilink delimiters while
// the text goes through the Markdown parser.
const OPEN_SENTINEL: char = '\u{e000}';
const CLOSE_SENTINEL: char = '\u{e001}';

#[derive(Debug)]
pub struct Rendered {
    pub html: String,
    pub outline: Vec<Heading>,
}

pub struct Renderer<'r> {
    config: &'r AppConfig,
    lookup: &'r dyn PageLookup,
}

impl<'r> Renderer<'r> {
    pub fn new(config: &'r AppConfig, lookup: &'r dyn PageLookup) -> Self {
        Self { config, lookup }
    }

    /// Render one document from raw file text.
    pub fn render(&self, source: &str) -> Rendered {
        let body = if self.config.keep_frontmatter {
            source
        } else {
            meta::strip_front_matter(source)
        };
        let body = snippets::expand(
            body,
            &self.config.snippets,
            &self.config.snippet_open,
            &self.config.snippet_close,
        );
        let body = body
            .replace("\\[[", &OPEN_SENTINEL.to_string())
            .replace("\\]]", &CLOSE_SENTINEL.to_string());

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        let events: Vec<Event> = Parser::new_ext(&body, options).collect();

        let resolver = wikilinks::WikilinkResolver::new(self.lookup, &self.config.base_url);
        let events = resolver.transform(events);
        let (events, outline) = headings::transform(events);
        let images_root = self.config.images_root();
        let rewriter = images::ImageRewriter::new(&self.config.images_url, &images_root);
        let events = rewriter.transform(events);
        let events = highlight::CodeHighlighter::transform(events);

        let mut html = String::new();
        push_html(&mut html, events.into_iter());
        let mut html = html
            .replace(OPEN_SENTINEL, "[[")
            .replace(CLOSE_SENTINEL, "]]");

        if self.config.generate_toc {
            html = splice_toc(html, &outline);
        }

        Rendered { html, outline }
    }

    /// Look a page up by URL and render its file.
    ///
    /// A URL with no record is [`Error::MissingPage`].
    pub fn render_page(&self, url: &str) -> Result<(Page, Rendered)> {
        let page = self
            .lookup
            .find_by_url(url)
            .ok_or_else(|| Error::MissingPage(url.to_string()))?;

        let path = self.config.content_root().join(&page.file);
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read page file {:?}", path))?;

        let rendered = self.render(&source);
        Ok((page, rendered))
    }
}

/// Insert the TOC after the first `</h1>`, or before everything when the
/// document has no level-1 heading. A single-entry outline gets no TOC.
fn splice_toc(html: String, outline: &[Heading]) -> String {
    if outline.len() < 2 {
        return html;
    }

    let mut toc = String::from("<div class=\"toc\"><ol>");
    for entry in outline {
        toc.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            entry.id,
            images::escape_attr(&entry.title)
        ));
        if !entry.children.is_empty() {
            toc.push_str("<ol>");
            for child in &entry.children {
                toc.push_str(&format!(
                    "<li><a href=\"#{}\">{}</a></li>",
                    child.id,
                    images::escape_attr(&child.title)
                ));
            }
            toc.push_str("</ol>");
        }
        toc.push_str("</li>");
    }
    toc.push_str("</ol></div>\n");

    match html.find("</h1>") {
        Some(pos) => {
            let split = pos + "</h1>".len();
            format!("{}\n{}{}", &html[..split], toc, &html[split..])
        }
        None => format!("{}{}", toc, html),
    }
}
