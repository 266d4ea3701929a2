//! LLM provider implementations.

use crate::client::Client;
use crate::options::{ModelOptions, TransportOptions};

/// Trait for LLM providers that can create configured clients.
pub trait Provider {
    /// The client type produced by this provider.
    type Client: Client;

    /// Model used when the caller does not pick one.
    const DEFAULT_MODEL: &'static str;

    /// Create a new client for `model`.
    fn create(api_key: String, model: String) -> Self::Client
    where
        <Self::Client as Client>::ModelProvider: Default,
    {
        Self::create_with_options(api_key, ModelOptions::new(model), TransportOptions::default())
    }

    /// Create a new client with custom options.
    fn create_with_options(
        api_key: String,
        model_options: ModelOptions<<Self::Client as Client>::ModelProvider>,
        transport_options: TransportOptions,
    ) -> Self::Client;
}

pub mod groq;
pub mod openai;

pub use groq::{Groq, GroqClient, GroqModel};
pub use openai::{OpenAi, OpenAiClient, OpenAiModel};
