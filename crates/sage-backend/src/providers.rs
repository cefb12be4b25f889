//! Provider and model registry.
//!
//! Pins the set of models each provider accepts, the default model per
//! provider, and per-MTok pricing for the Claude families.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A supported LLM provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ProviderError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProviderError {
    #[error("unknown provider '{0}' (expected 'anthropic' or 'openai')")]
    Unknown(String),
    #[error("Invalid model '{model}' for {provider}. Valid models: {}", valid.join(", "))]
    InvalidModel {
        provider: Provider,
        model: String,
        valid: Vec<&'static str>,
    },
}

const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
];

const OPENAI_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-2024-11-20",
    "gpt-4o-2024-08-06",
    "gpt-4o-2024-05-13",
    "gpt-4o-mini",
    "o1-preview",
    "o1-mini",
];

/// The pinned model list for a provider.
pub fn models(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Anthropic => ANTHROPIC_MODELS,
        Provider::OpenAi => OPENAI_MODELS,
    }
}

/// The default model for a provider.
pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Anthropic => "claude-3-5-sonnet-20241022",
        Provider::OpenAi => "gpt-4o-2024-11-20",
    }
}

/// Check that `model` is in the provider's pinned list.
pub fn validate_model(provider: Provider, model: &str) -> Result<(), ProviderError> {
    let valid = models(provider);
    if valid.contains(&model) {
        Ok(())
    } else {
        Err(ProviderError::InvalidModel {
            provider,
            model: model.to_string(),
            valid: valid.to_vec(),
        })
    }
}

/// Claude model families with a pricing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Opus,
    Sonnet,
    Haiku3,
    Haiku35,
}

/// USD per million tokens: (input, output, cache write, cache read).
pub fn pricing(family: ModelFamily) -> (f64, f64, f64, f64) {
    match family {
        ModelFamily::Opus => (15.0, 75.0, 18.75, 1.5),
        ModelFamily::Sonnet => (3.0, 15.0, 3.75, 0.3),
        ModelFamily::Haiku3 => (0.25, 1.25, 0.3, 0.03),
        ModelFamily::Haiku35 => (1.0, 3.0, 1.25, 0.1),
    }
}

/// Map a model id to its pricing family.
pub fn family_of(model: &str) -> Option<ModelFamily> {
    match model {
        "claude-3-opus-20240229" => Some(ModelFamily::Opus),
        "claude-3-5-sonnet-20241022" => Some(ModelFamily::Sonnet),
        "claude-3-haiku-20240307" => Some(ModelFamily::Haiku3),
        "claude-3-5-haiku-20241022" => Some(ModelFamily::Haiku35),
        _ => None,
    }
}

/// Cost in USD for a completed query, or None for models without pricing.
pub fn cost_usd(model: &str, input_tokens: u32, output_tokens: u32) -> Option<f64> {
    let (input_price, output_price, _, _) = pricing(family_of(model)?);
    Some(
        f64::from(input_tokens) * input_price / 1_000_000.0
            + f64::from(output_tokens) * output_price / 1_000_000.0,
    )
}
