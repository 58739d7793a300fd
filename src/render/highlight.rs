//! Code block highlighting with syntect.
//!
//! Explicitly tagged fences are highlighted with the syntax the tag names
//! and carry both the resolved highlighter class and a `language-<tag>`
//! class. Untagged blocks go through first-line auto-detection restricted
//! to a fixed allow-list of languages and carry only the detected class.
//! Anything that cannot be highlighted falls back to a plain escaped
//! `<pre><code>` block.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};
use std::sync::OnceLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Candidate languages for first-line auto-detection of untagged blocks.
const AUTODETECT_LANGUAGES: &[&str] = &[
    "bash", "c", "cpp", "css", "go", "html", "java", "javascript", "json", "markdown", "php",
    "python", "ruby", "rust", "sql", "xml", "yaml",
];

pub struct CodeHighlighter;

impl CodeHighlighter {
    pub fn transform<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::new();
        let mut in_code_block = false;
        let mut lang: Option<String> = None;
        let mut code = String::new();

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code.clear();
                    lang = match kind {
                        CodeBlockKind::Fenced(tag) if !tag.is_empty() => Some(tag.to_string()),
                        _ => None,
                    };
                }
                Event::Text(text) if in_code_block => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) if in_code_block => {
                    in_code_block = false;
                    // Trailing-line behavior is stable when the block always
                    // ends in a newline.
                    if !code.ends_with('\n') {
                        code.push('\n');
                    }
                    result.push(Event::Html(CowStr::from(render_block(
                        &code,
                        lang.take().as_deref(),
                    ))));
                }
                other => result.push(other),
            }
        }

        result
    }
}

fn render_block(code: &str, lang: Option<&str>) -> String {
    let resolved = match lang {
        Some(tag) => explicit_syntax(tag).map(|syntax| {
            let class = format!("hljs {} language-{}", tag.to_lowercase(), tag);
            (syntax, class)
        }),
        None => detect_syntax(code).map(|(syntax, token)| (syntax, format!("hljs {}", token))),
    };

    if let Some((syntax, class)) = resolved {
        if let Some(html) = highlight(code, syntax) {
            return format!("<pre><code class=\"{}\">{}</code></pre>\n", class, html);
        }
    }
    format!("<pre><code>{}</code></pre>\n", escape_code(code))
}

fn explicit_syntax(tag: &str) -> Option<&'static SyntaxReference> {
    let ss = syntax_set();
    ss.find_syntax_by_token(tag)
        .or_else(|| ss.find_syntax_by_extension(tag))
}

/// First-line detection, accepted only when the match is on the allow-list.
fn detect_syntax(code: &str) -> Option<(&'static SyntaxReference, &'static str)> {
    let first_line = code.lines().next().unwrap_or("");
    let found = syntax_set().find_syntax_by_first_line(first_line)?;
    AUTODETECT_LANGUAGES.iter().find_map(|token| {
        let candidate = syntax_set().find_syntax_by_token(token)?;
        (candidate.name == found.name).then_some((found, *token))
    })
}

fn highlight(code: &str, syntax: &SyntaxReference) -> Option<String> {
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set(), ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .ok()?;
    }
    Some(generator.finalize())
}

fn escape_code(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
