//! HTML parsing and DOM queries.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! cleaner and the content reducer to locate regions of a page with CSS
//! selectors and recover their markup as written in the source.
//!
//! # Example
//!
//! ```rust
//! use tabex_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Prices</h1>
//!             <table><tbody><tr><td>Widget</td></tr></tbody></table>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! let tables = doc.select("table").unwrap();
//! assert_eq!(tables.len(), 1);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::{Result, TabexError};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)[^>]*>").expect("valid regex"));

/// A parsed HTML document, along with the markup it was parsed from.
pub struct Document {
    html: Html,
    source: String,
}

impl Document {
    /// Parses a full HTML document.
    ///
    /// Parsing is lenient: malformed markup is repaired the way a browser
    /// would, so this never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), source: html.to_string() }
    }

    /// Gets the underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the whole document.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`TabexError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tabex_core::parse::Document;
    ///
    /// let doc = Document::parse(r#"<p class="price">1</p><p class="price">2</p>"#);
    /// assert_eq!(doc.select("p.price").unwrap().len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector, in document order.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Counts elements matching a CSS selector.
    pub fn count(&self, selector: &str) -> Result<usize> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).count())
    }

    /// Gets the content of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    /// Gets all text nodes of the document, concatenated.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }

    /// Gets the markup of `element` exactly as it appears in the source.
    ///
    /// The parser repairs markup (it adds `<tbody>` to bare tables, quotes
    /// attributes, closes open tags), so re-serializing an element can
    /// change its text and length. The element is located by counting
    /// start tags with its name. Elements the parser synthesized, or whose
    /// end tag is missing, fall back to their serialized form.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tabex_core::parse::Document;
    ///
    /// let doc = Document::parse("<p>x</p><table><tr><td>1</td></tr></table>");
    /// let table = doc.select_first("table").unwrap().unwrap();
    /// assert_eq!(doc.outer_source(&table), "<table><tr><td>1</td></tr></table>");
    /// assert!(table.outer_html().contains("<tbody>"));
    /// ```
    pub fn outer_source(&self, element: &Element<'_>) -> String {
        self.source_span(element)
            .map(str::to_string)
            .unwrap_or_else(|| element.outer_html())
    }

    fn source_span(&self, element: &Element<'_>) -> Option<&str> {
        let name = element.element.value().name();
        let same_name = parse_selector(name).ok()?;
        let ordinal = self.html.select(&same_name).position(|el| el == element.element)?;
        find_block(&self.source, name, ordinal)
    }
}

/// The `ordinal`-th `<name>` block of `source`, from its start tag through
/// the end tag that balances it.
fn find_block<'s>(source: &'s str, name: &str, ordinal: usize) -> Option<&'s str> {
    let mut seen = 0;
    let mut depth = 0;
    let mut start = None;

    for caps in TAG_PATTERN.captures_iter(source) {
        let (Some(tag), Some(tag_name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        if !tag_name.as_str().eq_ignore_ascii_case(name) {
            continue;
        }

        let closing = caps.get(1).is_some_and(|m| !m.is_empty());
        match (closing, start) {
            (false, None) => {
                if seen == ordinal {
                    start = Some(tag.start());
                    depth = 1;
                }
                seen += 1;
            }
            (false, Some(_)) => {
                depth += 1;
                seen += 1;
            }
            (true, Some(begin)) => {
                depth -= 1;
                if depth == 0 {
                    return Some(&source[begin..tag.end()]);
                }
            }
            (true, None) => {}
        }
    }
    None
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| TabexError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// A single element of a parsed [`Document`].
#[derive(Clone, Debug, PartialEq)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the HTML content including this element's own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the concatenated text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Whether any ancestor of this element has the given tag name.
    pub fn has_ancestor(&self, tag: &str) -> bool {
        self.element
            .ancestors()
            .filter_map(|node| node.value().as_element())
            .any(|el| el.name().eq_ignore_ascii_case(tag))
    }
}
