//! Connection to the remote MCP tool provider.
//!
//! A turn opens its own session and releases it when the turn ends. The
//! transport (an HTTP client) is opened first and moved into the session, so
//! closing the session tears the transport down after it; a failed handshake
//! drops the transport before the error reaches the caller. Dropping a
//! session without closing it (a cancelled turn) cancels the rmcp service
//! task as well.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, RawContent};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{ClientHandler, ServiceExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::http::build_http_client;
use crate::options::TransportOptions;
use crate::schema::JsonObject;
use crate::tools::{ToolDescriptor, ToolError, ToolInvocationResult, ToolService};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to open transport to {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("MCP handshake with {url} failed: {reason}")]
    Handshake { url: String, reason: String },
}

/// An open session with the tool provider.
#[async_trait]
pub trait ToolSession: ToolService {
    fn service(&self) -> &dyn ToolService;

    /// Shut the session down and release its transport.
    async fn close(self: Box<Self>);
}

/// Opens sessions with the tool provider, one per turn.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, ConnectionError>;
}

/// Connects to an MCP server over Streamable HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    url: String,
    transport_options: TransportOptions,
}

impl HttpConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport_options: TransportOptions::default(),
        }
    }

    pub fn with_transport_options(mut self, transport_options: TransportOptions) -> Self {
        self.transport_options = transport_options;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, ConnectionError> {
        debug!("Opening transport to {}", self.url);
        let http_client =
            build_http_client(&self.transport_options).map_err(|e| ConnectionError::Transport {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        let transport = StreamableHttpClientTransport::with_client(
            http_client,
            StreamableHttpClientTransportConfig::with_uri(self.url.clone()),
        );

        let service = ().serve(transport).await.map_err(|e| ConnectionError::Handshake {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        info!("Connected to MCP server at {}", self.url);

        Ok(Box::new(McpSession::new(service)))
    }
}

/// A running rmcp client session.
pub struct McpSession<S: ClientHandler> {
    service: RunningService<RoleClient, S>,
}

impl<S: ClientHandler> McpSession<S> {
    pub fn new(service: RunningService<RoleClient, S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: ClientHandler + Send + Sync> ToolService for McpSession<S> {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| ToolError::Remote(e.to_string()))?;
        Ok(tools.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(
        &self,
        name: String,
        args: JsonObject,
    ) -> Result<ToolInvocationResult, ToolError> {
        let params = CallToolRequestParam {
            name: name.clone().into(),
            arguments: Some(args),
        };

        let result = self
            .service
            .call_tool(params)
            .await
            .map_err(|e| ToolError::Remote(e.to_string()))?;

        // The first content segment carries the payload and must be text.
        let content = match result.content.into_iter().next().map(|c| c.raw) {
            Some(RawContent::Text(text)) => text.text,
            _ => return Err(ToolError::NoTextContent(name)),
        };

        Ok(ToolInvocationResult {
            content,
            remote_error: result.is_error.unwrap_or(false),
        })
    }
}

#[async_trait]
impl<S: ClientHandler + Send + Sync> ToolSession for McpSession<S> {
    fn service(&self) -> &dyn ToolService {
        self
    }

    async fn close(self: Box<Self>) {
        let session = *self;
        match session.service.cancel().await {
            Ok(reason) => debug!("MCP session closed: {:?}", reason),
            Err(e) => warn!("MCP session task failed while closing: {}", e),
        }
    }
}
