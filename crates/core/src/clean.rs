//! Markup cleaning and page statistics.
//!
//! [`clean_html`] strips everything a language model does not need to see
//! (scripts, styles, comments, head metadata, inline event handlers) and
//! [`html_stats`] summarizes the structure of the result.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::parse::Document;

static COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Configuration for markup cleaning
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Whether to remove script tags
    pub remove_scripts: bool,
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove noscript tags
    pub remove_noscript: bool,
    /// Whether to remove meta tags
    pub remove_meta: bool,
    /// Whether to remove link tags
    pub remove_links: bool,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
    /// Whether to drop `on*` event handler attributes
    pub strip_event_handlers: bool,
    /// Whether to drop attributes whose value is a `javascript:` URI
    pub strip_script_urls: bool,
    /// Whether to collapse whitespace inside each text node, dropping
    /// whitespace-only nodes
    pub collapse_whitespace: bool,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_noscript: true,
            remove_meta: true,
            remove_links: true,
            remove_comments: true,
            strip_event_handlers: true,
            strip_script_urls: true,
            collapse_whitespace: true,
        }
    }
}

impl CleanConfig {
    /// Only removes scripts and styles; used before reading visible text.
    fn scripts_and_styles() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_noscript: false,
            remove_meta: false,
            remove_links: false,
            remove_comments: false,
            strip_event_handlers: false,
            strip_script_urls: false,
            collapse_whitespace: false,
        }
    }
}

/// Structural statistics of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmlStats {
    /// Number of elements, including the implied `html`, `head` and `body`.
    pub element_count: usize,
    /// Number of characters across all text nodes.
    pub text_length: usize,
    /// Number of `<a>` elements.
    pub link_count: usize,
    /// Number of `<img>` elements.
    pub image_count: usize,
    /// Number of `<table>` elements, nested ones included.
    pub table_count: usize,
    /// Characters in the re-serialized document.
    pub cleaned_length: usize,
}

/// Cleans markup with the default configuration.
///
/// With `preserve_structure` the cleaned HTML is returned with each text
/// node's whitespace collapsed. Tags and attribute values are left as
/// written. Without it, only the visible text is returned, one space
/// between text nodes.
///
/// # Example
///
/// ```rust
/// use tabex_core::clean_html;
///
/// let html = r#"<div onclick="track()"><script>x()</script><p>Price: 10</p></div>"#;
/// let cleaned = clean_html(html, true);
/// assert!(!cleaned.contains("script"));
/// assert!(!cleaned.contains("onclick"));
/// assert!(cleaned.contains("Price: 10"));
///
/// assert_eq!(clean_html(html, false), "Price: 10");
/// ```
pub fn clean_html(html: &str, preserve_structure: bool) -> String {
    clean_html_with_config(html, &CleanConfig::default(), preserve_structure)
}

/// Cleans markup with a custom configuration.
pub fn clean_html_with_config(html: &str, config: &CleanConfig, preserve_structure: bool) -> String {
    if html.is_empty() {
        return String::new();
    }

    let collapse = preserve_structure && config.collapse_whitespace;
    let mut processed = rewrite_markup(html, config, collapse);

    if config.remove_comments {
        processed = COMMENT_PATTERN.replace_all(&processed, "").to_string();
    }

    if !preserve_structure {
        return visible_text(&processed);
    }

    processed
}

/// Removes tags and attributes in a single streaming pass. With `collapse`,
/// every text node is rewritten with single spaces between its words.
fn rewrite_markup(html: &str, config: &CleanConfig, collapse: bool) -> String {
    let strip_events = config.strip_event_handlers;
    let strip_urls = config.strip_script_urls;

    let removable = [
        ("script", config.remove_scripts),
        ("style", config.remove_styles),
        ("noscript", config.remove_noscript),
        ("meta", config.remove_meta),
        ("link", config.remove_links),
    ];

    let mut handlers: Vec<_> = removable
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(tag, _)| {
            lol_html::element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    if strip_events || strip_urls {
        handlers.push(lol_html::element!("*", move |el| {
            let doomed: Vec<String> = el
                .attributes()
                .iter()
                .filter(|attr| {
                    (strip_events && attr.name().starts_with("on")) || (strip_urls && is_script_url(&attr.value()))
                })
                .map(|attr| attr.name())
                .collect();
            for name in doomed {
                el.remove_attribute(&name);
            }
            Ok(())
        }));
    }

    let mut text_handlers = Vec::new();
    if collapse {
        // A text node can arrive split across chunks.
        let mut pending = String::new();
        text_handlers.push(lol_html::doc_text!(move |chunk| {
            pending.push_str(chunk.as_str());
            if chunk.last_in_text_node() {
                let collapsed = pending.split_whitespace().collect::<Vec<_>>().join(" ");
                chunk.replace(&collapsed, lol_html::html_content::ContentType::Html);
                pending.clear();
            } else {
                chunk.remove();
            }
            Ok(())
        }));
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: handlers,
            document_content_handlers: text_handlers,
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    match rewriter.write(html.as_bytes()) {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    match rewriter.end() {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    output
}

fn is_script_url(value: &str) -> bool {
    value.trim_start().to_ascii_lowercase().starts_with("javascript:")
}

/// Visible text with one space between trimmed text nodes.
fn visible_text(html: &str) -> String {
    let doc = Document::parse(html);
    doc.html()
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the readable text of a document as a single line.
///
/// Scripts and styles are dropped, each line is trimmed, runs of two or
/// more spaces split phrases, and the remaining phrases are joined by one
/// space.
pub fn extract_text_content(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let stripped = rewrite_markup(html, &CleanConfig::scripts_and_styles(), false);
    let text = Document::parse(&stripped).text_content();

    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes structural statistics for a document.
pub fn html_stats(html: &str) -> HtmlStats {
    if html.is_empty() {
        return HtmlStats::default();
    }

    let doc = Document::parse(html);
    let count = |selector: &str| doc.count(selector).unwrap_or(0);

    HtmlStats {
        element_count: count("*"),
        text_length: doc.text_content().chars().count(),
        link_count: count("a"),
        image_count: count("img"),
        table_count: count("table"),
        cleaned_length: doc.as_string().chars().count(),
    }
}
