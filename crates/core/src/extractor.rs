//! Extraction engine.
//!
//! The main entry point is [`Extractor`]: it sizes the content for the chosen
//! model, reduces the page, asks the model for a table, recovers the table
//! from whatever the model answered, and attaches token usage. Every failure
//! is folded into [`ExtractionResult::Failure`]; [`Extractor::extract`] never
//! returns an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use tabex_core::{ExtractionResult, extract_tabular};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let html = "<table><tr><th>Product</th></tr><tr><td>Widget</td></tr></table>";
//! match extract_tabular(html, "list the products", "llama-3.1-8b-instant", "gsk_...").await {
//!     ExtractionResult::Success(extraction) => println!("{} rows", extraction.table.len()),
//!     ExtractionResult::Failure { reason } => eprintln!("{}", reason),
//! }
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::budget::{BudgetConfig, ModelProfile, resolve_profile};
use crate::llm::{ChatRequest, GroqClient, LanguageModel};
use crate::prompt::{TEXT_CONTENT_PREFIX, build_request};
use crate::recovery::{EXCERPT_CHARS, parse_response_with_excerpt};
use crate::reduce::{ReducedContent, ReductionStrategy, reduce};
use crate::table::DataTable;
use crate::usage::{UsageReport, resolve_usage};
use crate::{Result, TabexError};

/// Description used when the model found nothing and said nothing.
pub const EMPTY_RESULT_DESCRIPTION: &str = "No data found matching the query";

/// Configuration for the [`Extractor`].
///
/// # Example
///
/// ```rust
/// use tabex_core::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .safety_factor(0.5)
///     .temperature(0.0)
///     .build();
/// assert_eq!(config.budget.safety_factor, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Token-to-character budget heuristics.
    pub budget: BudgetConfig,

    /// Sampling temperature sent to the model (default: 0.1).
    pub temperature: f32,

    /// Response characters quoted in schema errors (default: 500).
    pub excerpt_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { budget: BudgetConfig::default(), temperature: 0.1, excerpt_chars: EXCERPT_CHARS }
    }
}

impl ExtractorConfig {
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::new()
    }
}

/// Builder for ExtractorConfig.
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ExtractorConfig::default() }
    }

    /// Sets the estimated characters per token.
    pub fn chars_per_token(mut self, value: f64) -> Self {
        self.config.budget.chars_per_token = value;
        self
    }

    /// Sets the share of the token budget given to page content.
    pub fn safety_factor(mut self, value: f64) -> Self {
        self.config.budget.safety_factor = value;
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.config.temperature = value;
        self
    }

    pub fn excerpt_chars(mut self, value: usize) -> Self {
        self.config.excerpt_chars = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ExtractorConfig {
        self.config
    }
}

impl Default for ExtractorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything decided before the model is called.
#[derive(Debug, Clone)]
pub struct PreparedExtraction {
    pub profile: ModelProfile,
    pub char_budget: usize,
    pub reduced: ReducedContent,
    pub request: ChatRequest,
}

/// A successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub table: DataTable,
    pub description: Option<String>,
    pub usage: UsageReport,
    pub reduction: ReductionStrategy,
}

impl Extraction {
    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }
}

/// Outcome of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Success(Extraction),
    Failure { reason: String },
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts into a `Result`, with the failure reason as the error.
    pub fn into_result(self) -> std::result::Result<Extraction, String> {
        match self {
            Self::Success(extraction) => Ok(extraction),
            Self::Failure { reason } => Err(reason),
        }
    }
}

/// Turns page markup and a query into a table using a language model.
///
/// Each call is independent; an `Extractor` can be shared across tasks.
pub struct Extractor {
    model: Arc<dyn LanguageModel>,
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model, config: ExtractorConfig::default() }
    }

    pub fn with_config(model: Arc<dyn LanguageModel>, config: ExtractorConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Sizes, reduces and prompts without calling the model.
    ///
    /// # Errors
    ///
    /// Returns [`TabexError::EmptyQuery`] for a blank query.
    pub fn prepare(&self, html: &str, query: &str, model_id: &str) -> Result<PreparedExtraction> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TabexError::EmptyQuery);
        }

        let profile = resolve_profile(model_id);
        let char_budget = self.config.budget.char_budget(&profile);

        let start = Instant::now();
        let reduced = reduce(html, char_budget, query);
        debug!(
            model = model_id,
            char_budget,
            input_chars = html.chars().count(),
            reduced_chars = reduced.char_len(),
            strategy = %reduced.strategy,
            duration_ms = start.elapsed().as_millis(),
            "Content reduced"
        );

        let content = if reduced.strategy.is_markup() {
            reduced.content.clone()
        } else {
            format!("{}{}", TEXT_CONTENT_PREFIX, reduced.content)
        };
        let request = build_request(model_id, &content, query, self.config.temperature);

        Ok(PreparedExtraction { profile, char_budget, reduced, request })
    }

    /// Extracts a table from `html` answering `query` with model `model_id`.
    pub async fn extract(&self, html: &str, query: &str, model_id: &str) -> ExtractionResult {
        match self.try_extract(html, query, model_id).await {
            Ok(extraction) => ExtractionResult::Success(extraction),
            Err(e) => {
                warn!(error = %e, model = model_id, "Extraction failed");
                ExtractionResult::Failure { reason: e.to_string() }
            }
        }
    }

    async fn try_extract(&self, html: &str, query: &str, model_id: &str) -> Result<Extraction> {
        let prepared = self.prepare(html, query, model_id)?;

        let start = Instant::now();
        let response = self.model.invoke(&prepared.request).await?;
        debug!(model = model_id, duration_ms = start.elapsed().as_millis(), "Model responded");

        let parsed = parse_response_with_excerpt(&response.content, self.config.excerpt_chars)?;
        let table = DataTable::from_extracted(&parsed);
        let description = if table.is_empty() {
            Some(parsed.description.unwrap_or_else(|| EMPTY_RESULT_DESCRIPTION.to_string()))
        } else {
            parsed.description
        };
        let usage = resolve_usage(&response, prepared.profile.tokens_per_minute);

        info!(
            model = model_id,
            rows = table.len(),
            columns = table.columns.len(),
            strategy = %prepared.reduced.strategy,
            "Extraction complete"
        );

        Ok(Extraction { table, description, usage, reduction: prepared.reduced.strategy })
    }
}

/// One-shot extraction against Groq with the given API key.
pub async fn extract_tabular(html: &str, query: &str, model_id: &str, api_key: &str) -> ExtractionResult {
    if api_key.trim().is_empty() {
        return ExtractionResult::Failure {
            reason: TabexError::provider(crate::error::ProviderErrorKind::Auth, "API key is empty").to_string(),
        };
    }
    Extractor::new(Arc::new(GroqClient::new(api_key))).extract(html, query, model_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::DEFAULT_PROFILE;
    use crate::error::ProviderErrorKind;
    use crate::llm::ModelResponse;
    use crate::usage::TokenUsage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    enum Canned {
        Reply(ModelResponse),
        Fail(ProviderErrorKind, &'static str),
    }

    struct MockModel {
        canned: Canned,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockModel {
        fn replying(content: &str) -> Arc<Self> {
            Self::with(Canned::Reply(ModelResponse { content: content.to_string(), ..Default::default() }))
        }

        fn with(canned: Canned) -> Arc<Self> {
            Arc::new(Self { canned, requests: Mutex::new(Vec::new()) })
        }

        fn last_user_message(&self) -> String {
            let requests = self.requests.lock().unwrap();
            requests.last().unwrap().messages[1].content.clone()
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for MockModel {
        async fn invoke(&self, request: &ChatRequest) -> Result<ModelResponse> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.canned {
                Canned::Reply(response) => Ok(response.clone()),
                Canned::Fail(kind, message) => Err(TabexError::provider(*kind, *message)),
            }
        }
    }

    const PRODUCTS: &str = r#"{"columns":["Product","Price"],"rows":[{"data":{"Product":"Widget","Price":"10"}},{"data":{"Product":"Gadget","Price":"20"}}],"description":"Products"}"#;

    #[tokio::test]
    async fn test_small_page_sent_unchanged() {
        let model = MockModel::replying(PRODUCTS);
        let extractor = Extractor::new(model.clone());
        let html = "<table><tr><td>Widget</td><td>10</td></tr></table>";

        let extraction = extractor.extract(html, "products", "llama-3.1-8b-instant").await.into_result().unwrap();

        assert_eq!(extraction.reduction, ReductionStrategy::Unchanged);
        assert_eq!(extraction.columns(), ["Product", "Price"]);
        assert_eq!(extraction.table.len(), 2);
        assert_eq!(extraction.description.as_deref(), Some("Products"));
        assert!(model.last_user_message().contains(html));
        assert!(!model.last_user_message().contains(TEXT_CONTENT_PREFIX));
    }

    #[tokio::test]
    async fn test_widget_table_end_to_end() {
        let model = MockModel::replying(r#"{"columns":["Product","Price"],"rows":[{"data":{"Product":"Widget","Price":"10"}}]}"#);
        let html = "<table><tr><td>Widget</td><td>10</td></tr></table>";

        let extraction = Extractor::new(model.clone())
            .extract(html, "extract product and price", "llama-3.1-8b-instant")
            .await
            .into_result()
            .unwrap();

        assert!(model.last_user_message().starts_with(&format!("Content:\n{}\n", html)));
        assert_eq!(extraction.columns(), ["Product", "Price"]);
        assert_eq!(extraction.table.rows, vec![vec![json!("Widget"), json!("10")]]);
    }

    #[tokio::test]
    async fn test_text_fallback_gets_prefix() {
        let model = MockModel::replying(PRODUCTS);
        let extractor = Extractor::new(model.clone());
        let html = format!("<div>{}</div>", "Plain prose sentence. ".repeat(1000));

        let extraction = extractor.extract(&html, "summaries", "llama-3.1-8b-instant").await.into_result().unwrap();

        assert!(!extraction.reduction.is_markup());
        assert!(model.last_user_message().contains(TEXT_CONTENT_PREFIX));
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_model_call() {
        let model = MockModel::replying(PRODUCTS);
        let result = Extractor::new(model.clone()).extract("<p>x</p>", "   ", "llama-3.1-8b-instant").await;

        assert!(!result.is_success());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_failure() {
        let model = MockModel::with(Canned::Fail(ProviderErrorKind::Auth, "invalid api key"));
        let result = Extractor::new(model).extract("<p>x</p>", "q", "gemma2-9b-it").await;

        let reason = result.into_result().unwrap_err();
        assert!(reason.contains("authentication failed"));
        assert!(reason.contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_schema_failure_reports_excerpt() {
        let model = MockModel::replying("I am sorry, I cannot help with that.");
        let config = ExtractorConfig::builder().excerpt_chars(10).build();
        let result = Extractor::with_config(model, config).extract("<p>x</p>", "q", "gemma2-9b-it").await;

        let reason = result.into_result().unwrap_err();
        assert!(reason.starts_with("Failed to parse LLM response."));
        assert!(reason.ends_with("LLM response: I am sorry"));
    }

    #[tokio::test]
    async fn test_repaired_response() {
        let model = MockModel::replying("```json\n{\"rows\":[{\"Name\":\"Ann\"},{\"Name\":\"Bo\"}]}\n```");
        let extraction =
            Extractor::new(model).extract("<p>x</p>", "names", "gemma2-9b-it").await.into_result().unwrap();

        assert_eq!(extraction.columns(), ["Name"]);
        assert_eq!(extraction.table.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_rows_default_description() {
        let model = MockModel::replying(r#"{"columns":["A","B"],"rows":[]}"#);
        let extraction = Extractor::new(model).extract("<p>x</p>", "q", "gemma2-9b-it").await.into_result().unwrap();

        assert!(extraction.table.is_empty());
        assert_eq!(extraction.columns(), ["A", "B"]);
        assert_eq!(extraction.description.as_deref(), Some(EMPTY_RESULT_DESCRIPTION));
    }

    #[tokio::test]
    async fn test_usage_attached_with_tpm_limit() {
        let response = ModelResponse {
            content: PRODUCTS.to_string(),
            response_metadata: Some(json!({"usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}})),
            ..Default::default()
        };
        let model = MockModel::with(Canned::Reply(response));
        let extraction =
            Extractor::new(model).extract("<p>x</p>", "q", "llama-3.3-70b-versatile").await.into_result().unwrap();

        assert_eq!(
            extraction.usage,
            UsageReport::Reported(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
                tpm_limit: 30000
            })
        );
    }

    #[tokio::test]
    async fn test_missing_usage_still_succeeds() {
        let model = MockModel::replying(PRODUCTS);
        let result = Extractor::new(model).extract("<p>x</p>", "q", "unknown-model").await;

        let extraction = result.into_result().unwrap();
        assert_eq!(extraction.usage, UsageReport::Unavailable { tpm_limit: DEFAULT_PROFILE.tokens_per_minute });
    }

    #[test]
    fn test_prepare_uses_profile_budget() {
        let extractor = Extractor::new(MockModel::replying(PRODUCTS));
        let prepared = extractor.prepare("<p>x</p>", "q", "llama-3.1-8b-instant").unwrap();

        assert_eq!(prepared.char_budget, 9600);
        assert_eq!(prepared.profile.tokens_per_minute, 6000);
        assert_eq!(prepared.request.model, "llama-3.1-8b-instant");
        assert_eq!(prepared.request.temperature, Some(0.1));
    }

    #[test]
    fn test_builder() {
        let config = ExtractorConfig::builder().chars_per_token(3.0).safety_factor(0.5).temperature(0.0).build();
        assert_eq!(config.budget.chars_per_token, 3.0);
        assert_eq!(config.budget.safety_factor, 0.5);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.excerpt_chars, EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_extract_tabular_requires_key() {
        let result = extract_tabular("<p>x</p>", "q", "gemma2-9b-it", " ").await;
        assert!(result.into_result().unwrap_err().contains("API key"));
    }
}
