//! Model budgets.
//!
//! Each supported model has a fixed input-token budget and a tokens-per-minute
//! ceiling matching the provider's free tier. Unknown model names fall back
//! to [`DEFAULT_PROFILE`] so new models stay usable before they are listed.

use serde::Serialize;

/// Token limits of a language-model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelProfile {
    /// Usable input tokens per request.
    pub max_input_tokens: usize,
    /// Rate-limit ceiling in tokens per minute.
    pub tokens_per_minute: usize,
}

impl ModelProfile {
    const fn new(max_input_tokens: usize, tokens_per_minute: usize) -> Self {
        Self { max_input_tokens, tokens_per_minute }
    }
}

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Profile for model names missing from the registry.
pub const DEFAULT_PROFILE: ModelProfile = ModelProfile::new(5000, 14000);

const MODEL_PROFILES: &[(&str, ModelProfile)] = &[
    ("llama-3.1-8b-instant", ModelProfile::new(4000, 6000)),
    ("llama-3.3-70b-versatile", ModelProfile::new(8000, 30000)),
    ("llama-3-groq-8b-tool-use", ModelProfile::new(4000, 6000)),
    ("llama-3-groq-70b-tool-use", ModelProfile::new(8000, 30000)),
    ("mixtral-8x7b-32768", ModelProfile::new(8000, 30000)),
    ("gemma2-9b-it", ModelProfile::new(4000, 6000)),
    ("llama-3.2-3b-instruct", ModelProfile::new(4000, 6000)),
    ("llama-3.2-11b-versatile", ModelProfile::new(5000, 14000)),
];

/// Looks up the profile for a model, falling back to [`DEFAULT_PROFILE`].
///
/// # Example
///
/// ```rust
/// use tabex_core::{DEFAULT_PROFILE, resolve_profile};
///
/// assert_eq!(resolve_profile("llama-3.3-70b-versatile").tokens_per_minute, 30000);
/// assert_eq!(resolve_profile("some-new-model"), DEFAULT_PROFILE);
/// ```
pub fn resolve_profile(model_id: &str) -> ModelProfile {
    MODEL_PROFILES
        .iter()
        .find(|(name, _)| *name == model_id)
        .map(|(_, profile)| *profile)
        .unwrap_or(DEFAULT_PROFILE)
}

/// Whether the registry lists this model.
pub fn is_known_model(model_id: &str) -> bool {
    MODEL_PROFILES.iter().any(|(name, _)| *name == model_id)
}

/// All registered models with their profiles, in registry order.
pub fn known_models() -> impl Iterator<Item = (&'static str, ModelProfile)> {
    MODEL_PROFILES.iter().copied()
}

/// Converts a token budget into a character budget for the content reducer.
///
/// Both factors are heuristics: tokenization ratios vary by model and
/// language, and the safety factor leaves room for the prompt template,
/// the schema instructions, and the completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetConfig {
    /// Estimated characters per token (default: 4.0).
    pub chars_per_token: f64,
    /// Share of the token budget given to page content (default: 0.6).
    pub safety_factor: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { chars_per_token: 4.0, safety_factor: 0.6 }
    }
}

impl BudgetConfig {
    /// Character budget for content sent to a model with this profile.
    pub fn char_budget(&self, profile: &ModelProfile) -> usize {
        let chars = profile.max_input_tokens as f64 * self.chars_per_token * self.safety_factor;
        if chars.is_finite() && chars > 0.0 { chars as usize } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("llama-3.1-8b-instant", 4000, 6000)]
    #[case("llama-3.3-70b-versatile", 8000, 30000)]
    #[case("mixtral-8x7b-32768", 8000, 30000)]
    #[case("gemma2-9b-it", 4000, 6000)]
    #[case("llama-3.2-11b-versatile", 5000, 14000)]
    fn test_known_profiles(#[case] model: &str, #[case] tokens: usize, #[case] tpm: usize) {
        let profile = resolve_profile(model);
        assert_eq!(profile.max_input_tokens, tokens);
        assert_eq!(profile.tokens_per_minute, tpm);
        assert!(is_known_model(model));
    }

    #[test]
    fn test_unknown_model_gets_default() {
        assert_eq!(resolve_profile("gpt-unknown"), DEFAULT_PROFILE);
        assert_eq!(resolve_profile(""), DEFAULT_PROFILE);
        assert!(!is_known_model("gpt-unknown"));
    }

    #[test]
    fn test_default_model_is_registered() {
        assert!(is_known_model(DEFAULT_MODEL));
        assert_eq!(known_models().count(), 8);
    }

    #[test]
    fn test_char_budget_default_factors() {
        let config = BudgetConfig::default();
        assert_eq!(config.char_budget(&resolve_profile("llama-3.1-8b-instant")), 9600);
        assert_eq!(config.char_budget(&DEFAULT_PROFILE), 12000);
    }

    #[test]
    fn test_char_budget_custom_factors() {
        let config = BudgetConfig { chars_per_token: 3.0, safety_factor: 0.5 };
        assert_eq!(config.char_budget(&resolve_profile("llama-3.3-70b-versatile")), 12000);
    }

    #[test]
    fn test_char_budget_rejects_negative_factors() {
        let config = BudgetConfig { chars_per_token: 4.0, safety_factor: -1.0 };
        assert_eq!(config.char_budget(&DEFAULT_PROFILE), 0);
    }
}
