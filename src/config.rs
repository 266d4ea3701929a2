//! Process configuration.
//!
//! Everything can come from the command line or the environment. A missing
//! credential or server address stops the process before any turn runs.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::agent::AgentOptions;
use crate::options::TransportOptions;
use crate::policy::GroundingPolicy;
use crate::tools::ResultRule;

pub const DEFAULT_SERVER_URL: &str = "https://neuronworks-travel-agent.onrender.com/mcp";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key configured. Set GROQ_API_KEY or pass --api-key")]
    MissingApiKey,

    #[error("No MCP server URL configured. Set WAYFARER_SERVER_URL or pass --server-url")]
    MissingServerUrl,

    #[error("Failed to read grounding policy from {path}: {source}")]
    Policy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Parser)]
#[command(name = "wayfarer", about = "Grounded travel planning over MCP tools", version)]
pub struct Config {
    /// MCP server endpoint (Streamable HTTP)
    #[arg(long, env = "WAYFARER_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Credential for the language model backend
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier
    #[arg(long, env = "WAYFARER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Override the LLM endpoint (OpenAI-compatible, including the version path)
    #[arg(long, env = "WAYFARER_LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Replace the built-in grounding policy with the contents of this file
    #[arg(long)]
    pub policy_file: Option<PathBuf>,

    /// Tool payloads treated as "no data" (repeatable)
    #[arg(long = "empty-literal", default_values_t = ["[]".to_string(), "{}".to_string()])]
    pub empty_literals: Vec<String>,

    /// Substrings that mark a tool payload as an error (repeatable)
    #[arg(long = "error-marker", default_values_t = ["error".to_string()])]
    pub error_markers: Vec<String>,

    /// Report unknown tool names requested by the model on the status line
    #[arg(long)]
    pub warn_unresolved_tools: bool,

    /// HTTP timeout in seconds for model requests
    #[arg(long)]
    pub http_timeout: Option<u64>,

    /// Connect timeout in seconds, for the model backend and the MCP server
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout: u64,

    /// Run a single request and exit
    #[arg(short, long)]
    pub query: Option<String>,
}

impl Config {
    /// Check the settings that every turn depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingApiKey),
        }
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn grounding_policy(&self) -> Result<GroundingPolicy, ConfigError> {
        match &self.policy_file {
            Some(path) => GroundingPolicy::from_file(path).map_err(|source| ConfigError::Policy {
                path: path.clone(),
                source,
            }),
            None => Ok(GroundingPolicy::default()),
        }
    }

    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions {
            result_rule: ResultRule {
                empty_literals: self.empty_literals.clone(),
                error_markers: self.error_markers.clone(),
            },
            warn_unresolved_tools: self.warn_unresolved_tools,
        }
    }

    /// Transport options for the model backend.
    pub fn llm_transport(&self) -> TransportOptions {
        let options = self.mcp_transport();
        match self.http_timeout {
            Some(secs) => options.with_timeout(Duration::from_secs(secs)),
            None => options,
        }
    }

    /// Transport options for the MCP server. Tool calls carry no request
    /// timeout; only connecting is bounded.
    pub fn mcp_transport(&self) -> TransportOptions {
        TransportOptions::new().with_connect_timeout(Duration::from_secs(self.connect_timeout))
    }
}
