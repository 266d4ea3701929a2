//! OpenAI API client implementation.

use crate::api::openai::{OpenAiCompatibleClient, OpenAiCompatibleModel};
use crate::options::{ModelOptions, TransportOptions};
use crate::providers::Provider;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// OpenAI-only request fields.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiModel {
    pub parallel_tool_calls: Option<bool>,
    pub user: Option<String>,
}

impl OpenAiCompatibleModel for OpenAiModel {}

pub type OpenAiClient = OpenAiCompatibleClient<OpenAiModel>;

pub struct OpenAi;

impl Provider for OpenAi {
    type Client = OpenAiClient;

    const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    fn create_with_options(
        api_key: String,
        model_options: ModelOptions<OpenAiModel>,
        transport_options: TransportOptions,
    ) -> Self::Client {
        OpenAiClient::new(
            api_key,
            "https://api.openai.com/v1".to_string(),
            model_options,
            transport_options,
        )
    }
}
