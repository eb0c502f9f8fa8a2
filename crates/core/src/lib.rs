pub mod budget;
pub mod clean;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod formatters;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod recovery;
pub mod reduce;
pub mod schema;
pub mod table;
pub mod usage;

pub use budget::{BudgetConfig, DEFAULT_MODEL, DEFAULT_PROFILE, ModelProfile, is_known_model, known_models, resolve_profile};
pub use clean::{CleanConfig, HtmlStats, clean_html, clean_html_with_config, extract_text_content, html_stats};
pub use error::{ProviderErrorKind, Result, TabexError};
pub use extractor::{
    EMPTY_RESULT_DESCRIPTION, Extraction, ExtractionResult, Extractor, ExtractorConfig, ExtractorConfigBuilder,
    PreparedExtraction, extract_tabular,
};
pub use fetch::{FetchConfig, FetchedPage, fetch_file, fetch_page, fetch_stdin, normalize_url};
pub use formatters::{JsonFormatter, TextTableConfig, to_csv, to_json, to_text_table};
pub use llm::{ChatRequest, GroqClient, LanguageModel, Message, ModelResponse};
pub use parse::Document;
pub use recovery::{parse_response, parse_response_with_excerpt};
pub use reduce::{ReducedContent, ReductionStrategy, reduce};
pub use schema::{ExtractedTable, TableRow};
pub use table::{DataTable, ExportFormat};
pub use usage::{TokenUsage, UsageReport, resolve_usage};
