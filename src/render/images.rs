//! Image rendering with intrinsic dimensions.
//!
//! Relative image references are rewritten onto the configured public image
//! URL, and when the referenced file exists under the local images directory
//! its pixel dimensions are probed and emitted as `width`/`height`
//! attributes. Remote or missing images render without dimensions.

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use std::path::Path;
use tracing::debug;

pub struct ImageRewriter<'r> {
    images_url: &'r str,
    images_dir: &'r Path,
}

impl<'r> ImageRewriter<'r> {
    pub fn new(images_url: &'r str, images_dir: &'r Path) -> Self {
        Self {
            images_url,
            images_dir,
        }
    }

    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::new();
        let mut iter = events.into_iter();

        while let Some(event) = iter.next() {
            let Event::Start(Tag::Image {
                dest_url, title, ..
            }) = event
            else {
                result.push(event);
                continue;
            };

            // Alt text is everything up to the matching end tag.
            let mut alt = String::new();
            for inner in iter.by_ref() {
                match inner {
                    Event::End(TagEnd::Image) => break,
                    Event::Text(t) => alt.push_str(&t),
                    Event::Code(c) => alt.push_str(&c),
                    _ => {}
                }
            }

            result.push(Event::Html(CowStr::from(self.render_img(
                &dest_url, &alt, &title,
            ))));
        }

        result
    }

    fn render_img(&self, dest: &str, alt: &str, title: &str) -> String {
        let remote = dest.starts_with("http://")
            || dest.starts_with("https://")
            || dest.starts_with('/');

        let (src, dimensions) = if remote {
            (dest.to_string(), None)
        } else {
            let src = format!("{}/{}", self.images_url.trim_end_matches('/'), dest);
            let local = self.images_dir.join(dest);
            let dimensions = if local.is_file() {
                match image::image_dimensions(&local) {
                    Ok(dims) => Some(dims),
                    Err(e) => {
                        debug!(path = ?local, error = %e, "could not probe image dimensions");
                        None
                    }
                }
            } else {
                None
            };
            (src, dimensions)
        };

        let mut img = format!(
            "<img src=\"{}\" alt=\"{}\"",
            escape_attr(&src),
            escape_attr(alt)
        );
        if !title.is_empty() {
            img.push_str(&format!(" title=\"{}\"", escape_attr(title)));
        }
        if let Some((width, height)) = dimensions {
            img.push_str(&format!(" width=\"{}\" height=\"{}\"", width, height));
        }
        img.push_str(" />");

        format!("<span class=\"imagewrap\">{}</span>", img)
    }
}

/// Escape for a double-quoted HTML attribute value.
pub(crate) fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
