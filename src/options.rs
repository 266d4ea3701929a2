//! Model and transport configuration.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use std::time::Duration;

/// Sampling settings shared by every backend, plus backend-only fields in `T`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOptions<T> {
    /// Model identifier, e.g. "llama-3.1-8b-instant".
    pub model: String,

    /// Sampling temperature (0.0 - 2.0). Planning wants this low.
    pub temperature: Option<f32>,

    pub top_p: Option<f32>,

    /// Upper bound on generated tokens per request.
    pub max_tokens: Option<u32>,

    /// Backend-specific request fields.
    pub provider: T,
}

impl<T: Default> ModelOptions<T> {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            provider: T::default(),
        }
    }
}

impl<T> ModelOptions<T> {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// How requests reach a remote endpoint.
///
/// The model client and the MCP transport each get their own value: tool
/// sessions keep a stream open, so they usually carry only a connect timeout.
#[derive(Debug, Clone)]
pub enum TransportOptions {
    Http {
        /// Whole-request timeout. None leaves requests unbounded.
        timeout: Option<Duration>,
        /// Timeout for establishing the TCP/TLS connection.
        connect_timeout: Option<Duration>,
        proxy: Option<String>,
        /// Sent with every request.
        headers: Option<HashMap<String, String>>,
    },
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions::Http {
            timeout: None,
            connect_timeout: None,
            proxy: None,
            headers: None,
        }
    }
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        let TransportOptions::Http { timeout, .. } = &mut self;
        *timeout = Some(duration);
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        let TransportOptions::Http {
            connect_timeout, ..
        } = &mut self;
        *connect_timeout = Some(duration);
        self
    }

    pub fn with_proxy(mut self, proxy_url: String) -> Self {
        let TransportOptions::Http { proxy, .. } = &mut self;
        *proxy = Some(proxy_url);
        self
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        let TransportOptions::Http { headers, .. } = &mut self;
        headers.get_or_insert_with(HashMap::new).insert(key, value);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        let TransportOptions::Http { timeout, .. } = self;
        *timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        let TransportOptions::Http {
            connect_timeout, ..
        } = self;
        *connect_timeout
    }
}
