//! Query-aware content reduction.
//!
//! When cleaned markup exceeds a model's character budget, [`reduce`] walks
//! an ordered chain of strategies and keeps the first result that fits:
//!
//! 1. the document itself, when it already fits;
//! 2. all outermost `<table>` blocks, when the query asks for tabular data;
//! 3. the first primary-content region (`main`, `article`, ...);
//! 4. the visible text, truncated at a sentence or line boundary.
//!
//! Budgets and lengths are counted in characters, not bytes.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::clean::extract_text_content;
use crate::parse::Document;

/// Query words that signal the user wants tabular regions.
pub const TABULAR_KEYWORDS: &[&str] = &["table", "data", "row", "column", "list", "record", "product"];

/// Primary-content regions, probed in order.
pub const CONTENT_SELECTORS: &[&str] = &["main", "article", "[role=\"main\"]", "#content", ".content", "body"];

/// Appended when text had to be cut without a natural boundary.
pub const TRUNCATION_MARKER: &str = "... [Content truncated]";

/// A boundary is accepted only past this share of the budget.
const BOUNDARY_WINDOW: f64 = 0.8;

/// How a [`ReducedContent`] was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReductionStrategy {
    /// The document fit the budget and was returned as is.
    Unchanged,
    /// The concatenated tables of the document.
    Tables { count: usize },
    /// A primary-content region matched by `selector`.
    MainContent { selector: String },
    /// Visible text; `truncated` when it was cut to fit.
    PlainText { truncated: bool },
    /// The document has no visible text, so its markup was hard-truncated.
    RawTruncated,
}

impl ReductionStrategy {
    /// Whether the reduced content is still markup.
    pub fn is_markup(&self) -> bool {
        !matches!(self, Self::PlainText { .. })
    }
}

impl fmt::Display for ReductionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Tables { count } => write!(f, "{} table(s)", count),
            Self::MainContent { selector } => write!(f, "main content ({})", selector),
            Self::PlainText { truncated: false } => write!(f, "plain text"),
            Self::PlainText { truncated: true } => write!(f, "truncated plain text"),
            Self::RawTruncated => write!(f, "truncated markup"),
        }
    }
}

/// The part of a document selected to fit a character budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReducedContent {
    /// The selected content.
    pub content: String,
    /// The strategy that produced it.
    #[serde(flatten)]
    pub strategy: ReductionStrategy,
}

impl ReducedContent {
    fn new(content: String, strategy: ReductionStrategy) -> Self {
        Self { content, strategy }
    }

    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Selects the most query-relevant part of `markup` that fits `char_budget`.
///
/// Markup that fits the budget is returned unchanged, byte for byte.
/// Oversized whitespace-only markup yields empty content; any other input
/// yields non-empty content. Structural blocks are returned as written in
/// `markup` and never exceed the budget; text results exceed it by at most
/// [`TRUNCATION_MARKER`].
///
/// # Example
///
/// ```rust
/// use tabex_core::{ReductionStrategy, reduce};
///
/// let html = format!(
///     "<html><body><p>{}</p><table><tr><td>Widget</td></tr></table></body></html>",
///     "filler ".repeat(100),
/// );
/// let reduced = reduce(&html, 200, "get the table");
/// assert_eq!(reduced.strategy, ReductionStrategy::Tables { count: 1 });
/// assert_eq!(reduced.content, "<table><tr><td>Widget</td></tr></table>");
/// ```
pub fn reduce(markup: &str, char_budget: usize, query: &str) -> ReducedContent {
    let markup_len = markup.chars().count();
    if markup_len <= char_budget {
        return ReducedContent::new(markup.to_string(), ReductionStrategy::Unchanged);
    }

    if markup.trim().is_empty() {
        return ReducedContent::new(String::new(), ReductionStrategy::Unchanged);
    }

    let doc = Document::parse(markup);

    let reduced = tables_for_query(&doc, char_budget, query)
        .or_else(|| main_content(&doc, char_budget))
        .unwrap_or_else(|| text_fallback(markup, char_budget));

    debug!(
        original_chars = markup_len,
        reduced_chars = reduced.char_len(),
        budget = char_budget,
        strategy = %reduced.strategy,
        "reduced content"
    );
    reduced
}

/// Whether the query mentions a tabular keyword.
pub fn wants_tabular(query: &str) -> bool {
    let query = query.to_lowercase();
    TABULAR_KEYWORDS.iter().any(|word| query.contains(word))
}

fn tables_for_query(doc: &Document, char_budget: usize, query: &str) -> Option<ReducedContent> {
    if !wants_tabular(query) {
        return None;
    }

    let tables: Vec<String> = doc
        .select("table")
        .ok()?
        .into_iter()
        .filter(|table| !table.has_ancestor("table"))
        .map(|table| doc.outer_source(&table))
        .collect();

    if tables.is_empty() {
        return None;
    }

    let joined = tables.join("\n");
    (joined.chars().count() <= char_budget)
        .then(|| ReducedContent::new(joined, ReductionStrategy::Tables { count: tables.len() }))
}

fn main_content(doc: &Document, char_budget: usize) -> Option<ReducedContent> {
    for selector in CONTENT_SELECTORS {
        let Ok(Some(region)) = doc.select_first(selector) else {
            continue;
        };

        let html = doc.outer_source(&region);
        if html.chars().count() <= char_budget {
            let strategy = ReductionStrategy::MainContent { selector: selector.to_string() };
            return Some(ReducedContent::new(html, strategy));
        }
        // Later selectors are broader regions; an oversized match ends the probe.
        return None;
    }
    None
}

fn text_fallback(markup: &str, char_budget: usize) -> ReducedContent {
    let text = extract_text_content(markup);
    if text.is_empty() {
        let (cut, _) = truncate_chars(markup, char_budget);
        return ReducedContent::new(format!("{}{}", cut, TRUNCATION_MARKER), ReductionStrategy::RawTruncated);
    }

    let (truncated, was_cut) = truncate_chars(&text, char_budget);
    if !was_cut {
        return ReducedContent::new(text, ReductionStrategy::PlainText { truncated: false });
    }

    let content = match natural_boundary(truncated, char_budget) {
        Some(end) => truncated[..end].to_string(),
        None => format!("{}{}", truncated, TRUNCATION_MARKER),
    };
    ReducedContent::new(content, ReductionStrategy::PlainText { truncated: true })
}

/// Returns the first `max_chars` characters and whether anything was cut.
fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Byte offset just past the last period or newline, if it lies in the
/// final 20% of the window.
fn natural_boundary(truncated: &str, char_budget: usize) -> Option<usize> {
    let cut = truncated.rfind(['.', '\n'])?;
    let cut_chars = truncated[..cut].chars().count();
    (cut_chars as f64 > char_budget as f64 * BOUNDARY_WINDOW).then_some(cut + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded_page(body: &str, filler_words: usize) -> String {
        format!(
            "<html><head></head><body><p>{}</p>{}</body></html>",
            "filler ".repeat(filler_words),
            body
        )
    }

    #[test]
    fn test_fits_budget_unchanged() {
        let html = "<table><tr><td>Widget</td><td>10</td></tr></table>";
        let reduced = reduce(html, 1000, "extract product and price");
        assert_eq!(reduced.content, html);
        assert_eq!(reduced.strategy, ReductionStrategy::Unchanged);
    }

    #[test]
    fn test_empty_and_whitespace_documents() {
        assert!(reduce("", 10, "table").is_empty());
        assert!(reduce("   \n\t ", 2, "table").is_empty());
    }

    #[test]
    fn test_whitespace_within_budget_unchanged() {
        let reduced = reduce("  \n ", 10, "table");
        assert_eq!(reduced.content, "  \n ");
        assert_eq!(reduced.strategy, ReductionStrategy::Unchanged);
    }

    #[test]
    fn test_bare_table_measured_as_written() {
        let table = "<table><tr><td>Widget</td><td>10</td></tr></table>";
        let html = format!("<html><body><p>{}</p>{}</body></html>", "filler ".repeat(20), table);

        let reduced = reduce(&html, 56, "get the table");
        assert_eq!(reduced.strategy, ReductionStrategy::Tables { count: 1 });
        assert_eq!(reduced.content, table);
    }

    #[test]
    fn test_bare_tables_joined_from_source() {
        let first = "<table class=a><tr><td>A</td></tr></table>";
        let second = "<TABLE><TR><TD>B</TD></TR></TABLE>";
        let html = padded_page(&format!("{}<p>between</p>{}", first, second), 200);

        let reduced = reduce(&html, 100, "rows");
        assert_eq!(reduced.content, format!("{}\n{}", first, second));
        assert_eq!(reduced.strategy, ReductionStrategy::Tables { count: 2 });
    }

    #[test]
    fn test_tables_for_tabular_query() {
        let first = "<table><tbody><tr><td>A</td></tr></tbody></table>";
        let second = "<table><tbody><tr><td>B</td></tr></tbody></table>";
        let html = padded_page(&format!("<div>{}</div><p>between</p>{}", first, second), 200);

        let reduced = reduce(&html, 500, "Get all TABLE data");
        assert_eq!(reduced.content, format!("{}\n{}", first, second));
        assert_eq!(reduced.strategy, ReductionStrategy::Tables { count: 2 });
    }

    #[test]
    fn test_nested_tables_not_duplicated() {
        let table = "<table><tbody><tr><td><table><tbody><tr><td>inner</td></tr></tbody></table></td></tr></tbody></table>";
        let html = padded_page(table, 200);

        let reduced = reduce(&html, 500, "rows please");
        assert_eq!(reduced.content, table);
        assert_eq!(reduced.strategy, ReductionStrategy::Tables { count: 1 });
    }

    #[test]
    fn test_non_tabular_query_skips_tables() {
        let table = "<table><tbody><tr><td>A</td></tr></tbody></table>";
        let html = padded_page(&format!("<main>{}</main>", table), 200);

        let reduced = reduce(&html, 500, "who wrote this?");
        assert_eq!(reduced.strategy, ReductionStrategy::MainContent { selector: "main".into() });
        assert_eq!(reduced.content, format!("<main>{}</main>", table));
    }

    #[test]
    fn test_oversized_tables_fall_through_to_main() {
        let table = format!("<table><tbody><tr><td>{}</td></tr></tbody></table>", "x".repeat(300));
        let html = format!(
            "<html><head></head><body><article>{}</article><p>{}</p></body></html>",
            "short story",
            "filler ".repeat(100)
        );
        let html = html.replace("<p>", &format!("{}<p>", table));

        let reduced = reduce(&html, 200, "table of values");
        assert_eq!(reduced.strategy, ReductionStrategy::MainContent { selector: "article".into() });
        assert_eq!(reduced.content, "<article>short story</article>");
    }

    #[test]
    fn test_selector_order() {
        let html = padded_page(
            r#"<div class="content">by class</div><div id="content">by id</div><div role="main">by role</div>"#,
            200,
        );

        let reduced = reduce(&html, 300, "summary");
        assert_eq!(
            reduced.strategy,
            ReductionStrategy::MainContent { selector: "[role=\"main\"]".into() }
        );
        assert_eq!(reduced.content, r#"<div role="main">by role</div>"#);
    }

    #[test]
    fn test_oversized_main_stops_probing() {
        let html = format!(
            "<html><head></head><body><main>{}</main><article>small</article></body></html>",
            "Sentence here. ".repeat(40)
        );

        let reduced = reduce(&html, 100, "summary");
        assert!(matches!(reduced.strategy, ReductionStrategy::PlainText { .. }));
        assert!(!reduced.content.contains("<article>"));
    }

    #[test]
    fn test_text_fallback_cuts_at_sentence() {
        let html = format!("<html><body><main>{}</main></body></html>", "Sentence here. ".repeat(40));

        let reduced = reduce(&html, 100, "summary");
        assert_eq!(reduced.strategy, ReductionStrategy::PlainText { truncated: true });
        assert!(reduced.content.ends_with('.'));
        assert!(reduced.char_len() <= 100);
        assert!(reduced.char_len() > 80);
    }

    #[test]
    fn test_text_fallback_hard_truncates_without_boundary() {
        let html = format!("<html><body><main>{}</main></body></html>", "word ".repeat(100));

        let reduced = reduce(&html, 50, "summary");
        assert_eq!(reduced.strategy, ReductionStrategy::PlainText { truncated: true });
        assert!(reduced.content.ends_with(TRUNCATION_MARKER));
        assert_eq!(reduced.char_len(), 50 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_text_fallback_fits_without_cut() {
        let html = format!(
            "<html><body><main><div class=\"{}\">tiny text</div></main></body></html>",
            "c".repeat(200)
        );

        let reduced = reduce(&html, 50, "summary");
        assert_eq!(reduced.content, "tiny text");
        assert_eq!(reduced.strategy, ReductionStrategy::PlainText { truncated: false });
    }

    #[test]
    fn test_markup_without_text_never_empty() {
        let html = format!("<html><body>{}</body></html>", "<img src=\"a.png\">".repeat(20));

        let reduced = reduce(&html, 30, "images");
        assert_eq!(reduced.strategy, ReductionStrategy::RawTruncated);
        assert!(!reduced.is_empty());
        assert!(reduced.char_len() <= 30 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_zero_budget_never_empty() {
        let reduced = reduce("<p>hello</p>", 0, "anything");
        assert!(!reduced.is_empty());
        assert_eq!(reduced.content, TRUNCATION_MARKER);
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundary() {
        let html = format!("<html><body><main>{}</main></body></html>", "привет ".repeat(50));

        let reduced = reduce(&html, 40, "summary");
        assert!(reduced.content.ends_with(TRUNCATION_MARKER));
        assert_eq!(reduced.char_len(), 40 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_wants_tabular() {
        assert!(wants_tabular("List all links"));
        assert!(wants_tabular("extract product and price"));
        assert!(!wants_tabular("who is the author?"));
    }

    #[test]
    fn test_strategy_markup_flag() {
        assert!(ReductionStrategy::Tables { count: 1 }.is_markup());
        assert!(!ReductionStrategy::PlainText { truncated: false }.is_markup());
        assert!(ReductionStrategy::RawTruncated.is_markup());
    }
}
