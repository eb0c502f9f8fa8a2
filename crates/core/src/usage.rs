//! Best-effort token usage telemetry.
//!
//! Providers report token counts through several alternative response
//! channels. [`resolve_usage`] probes them in a fixed order and accepts the
//! first one carrying a recognizable usage structure. A missing or malformed
//! usage block never fails an extraction.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::llm::ModelResponse;

/// Token counts for one model call, plus the model's rate limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Tokens-per-minute limit of the resolved model profile
    pub tpm_limit: usize,
}

impl TokenUsage {
    /// Share of the per-minute token limit consumed by this call, in percent.
    pub fn utilization(&self) -> f64 {
        if self.tpm_limit == 0 {
            return 0.0;
        }
        self.total_tokens as f64 / self.tpm_limit as f64 * 100.0
    }
}

/// Outcome of usage resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsageReport {
    Reported(TokenUsage),
    /// No channel carried usage data. The model's limit is still known.
    Unavailable { tpm_limit: usize },
    /// A channel carried usage data that could not be read.
    Error { message: String },
}

impl UsageReport {
    pub fn tokens(&self) -> Option<&TokenUsage> {
        match self {
            Self::Reported(usage) => Some(usage),
            _ => None,
        }
    }

    /// Tokens-per-minute limit attached to a successful resolution.
    pub fn tpm_limit(&self) -> Option<usize> {
        match self {
            Self::Reported(usage) => Some(usage.tpm_limit),
            Self::Unavailable { tpm_limit } => Some(*tpm_limit),
            Self::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    prompt: u64,
    completion: u64,
    total: u64,
}

/// `None` when the channel has nothing to say, `Some(Err)` when it has
/// something unreadable.
type Probe = fn(&ModelResponse) -> Option<Result<Counts, String>>;

const PROBES: &[(&str, Probe)] = &[
    ("response_metadata", from_response_metadata),
    ("usage_metadata", from_usage_metadata),
    ("llm_output", from_llm_output),
    ("additional_kwargs", from_additional_kwargs),
];

/// Resolves token usage from a model response and attaches `tpm_limit`.
pub fn resolve_usage(response: &ModelResponse, tpm_limit: usize) -> UsageReport {
    let found = PROBES.iter().find_map(|(channel, probe)| probe(response).map(|counts| (*channel, counts)));

    match found {
        Some((channel, Ok(counts))) => {
            tracing::debug!(channel, prompt = counts.prompt, completion = counts.completion, total = counts.total, "Token usage resolved");
            UsageReport::Reported(TokenUsage {
                prompt_tokens: counts.prompt,
                completion_tokens: counts.completion,
                total_tokens: counts.total,
                tpm_limit,
            })
        }
        Some((channel, Err(message))) => {
            tracing::warn!(channel, %message, "Unreadable token usage");
            UsageReport::Error { message }
        }
        None => UsageReport::Unavailable { tpm_limit },
    }
}

fn from_response_metadata(response: &ModelResponse) -> Option<Result<Counts, String>> {
    let metadata = response.response_metadata.as_ref()?.as_object()?;
    if let Some(Value::Object(usage)) = metadata.get("usage") {
        return Some(read_counts(usage, "prompt_tokens", "completion_tokens"));
    }
    if metadata.contains_key("prompt_tokens") || metadata.contains_key("total_tokens") {
        return Some(read_counts(metadata, "prompt_tokens", "completion_tokens"));
    }
    None
}

fn from_usage_metadata(response: &ModelResponse) -> Option<Result<Counts, String>> {
    let usage = response.usage_metadata.as_ref()?.as_object()?;
    if usage.contains_key("input_tokens") || usage.contains_key("output_tokens") {
        return Some(read_counts(usage, "input_tokens", "output_tokens"));
    }
    if usage.is_empty() {
        return None;
    }
    Some(read_counts(usage, "prompt_tokens", "completion_tokens"))
}

fn from_llm_output(response: &ModelResponse) -> Option<Result<Counts, String>> {
    let output = response.llm_output.as_ref()?.as_object()?;
    match output.get("token_usage").or_else(|| output.get("usage"))? {
        Value::Object(usage) => Some(read_counts(usage, "prompt_tokens", "completion_tokens")),
        _ => None,
    }
}

fn from_additional_kwargs(response: &ModelResponse) -> Option<Result<Counts, String>> {
    match response.additional_kwargs.as_ref()?.get("usage")? {
        Value::Object(usage) => Some(read_counts(usage, "prompt_tokens", "completion_tokens")),
        _ => None,
    }
}

/// Absent counters read as zero; a missing total is the sum of the parts.
fn read_counts(usage: &Map<String, Value>, prompt_key: &str, completion_key: &str) -> Result<Counts, String> {
    let prompt = read_counter(usage, prompt_key)?;
    let completion = read_counter(usage, completion_key)?;
    let total = match usage.get("total_tokens") {
        Some(_) => read_counter(usage, "total_tokens")?,
        None => prompt + completion,
    };
    Ok(Counts { prompt, completion, total })
}

fn read_counter(usage: &Map<String, Value>, key: &str) -> Result<u64, String> {
    match usage.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| format!("usage field '{}' is not a token count: {}", key, value)),
    }
}
