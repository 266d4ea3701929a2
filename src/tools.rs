//! Remote tool discovery and the per-turn tool registry.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::{ArgumentShape, JsonObject, ShapeError};

/// Error type for tool discovery and execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool error: {0}")]
    Remote(String),

    #[error("Tool {0} returned no text content")]
    NoTextContent(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: ShapeError,
    },
}

/// A tool as announced by the remote provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: JsonObject,
}

impl From<rmcp::model::Tool> for ToolDescriptor {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
            input_schema: (*tool.input_schema).clone(),
        }
    }
}

/// Raw payload of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocationResult {
    pub content: String,
    /// Set when the provider marked the call result as an error.
    pub remote_error: bool,
}

impl ToolInvocationResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            remote_error: false,
        }
    }
}

/// The remote side of the tool protocol: discovery plus invocation.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// List available tools.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Execute a tool.
    async fn call_tool(
        &self,
        name: String,
        args: JsonObject,
    ) -> Result<ToolInvocationResult, ToolError>;
}

/// Tool entry as offered to the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

type Invoker<'s> =
    Box<dyn Fn(JsonObject) -> BoxFuture<'s, Result<ToolInvocationResult, ToolError>> + Send + Sync + 's>;

/// A callable tool bound to the session that discovered it.
pub struct ToolHandle<'s> {
    pub name: String,
    pub description: String,
    pub shape: ArgumentShape,
    invoke: Invoker<'s>,
}

impl<'s> ToolHandle<'s> {
    /// Bind a descriptor to a session. The invocation closure owns its own
    /// copy of the tool name.
    pub fn bind(descriptor: ToolDescriptor, service: &'s dyn ToolService) -> Self {
        let shape = ArgumentShape::from_schema(&descriptor.name, &descriptor.input_schema);
        let bound_name = descriptor.name.clone();
        let invoke: Invoker<'s> = Box::new(move |args| {
            let name = bound_name.clone();
            Box::pin(async move { service.call_tool(name, args).await })
        });

        Self {
            name: descriptor.name,
            description: descriptor.description,
            shape,
            invoke,
        }
    }

    /// Validate `arguments` against the shape and call the remote tool.
    pub async fn invoke(&self, arguments: &Value) -> Result<ToolInvocationResult, ToolError> {
        let bound = self
            .shape
            .bind(arguments)
            .map_err(|source| ToolError::InvalidArguments {
                tool: self.name.clone(),
                source,
            })?;
        (self.invoke)(bound).await
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.shape.to_json_schema(),
        }
    }
}

impl fmt::Debug for ToolHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// All tools discovered for the current turn, keyed by name.
#[derive(Debug, Default)]
pub struct ToolRegistry<'s> {
    handles: HashMap<String, ToolHandle<'s>>,
    order: Vec<String>,
}

impl<'s> ToolRegistry<'s> {
    /// Ask the provider for its tools and bind one handle per descriptor.
    pub async fn discover(service: &'s dyn ToolService) -> Result<Self, ToolError> {
        let descriptors = service.list_tools().await?;
        debug!("Discovered {} tool descriptors", descriptors.len());

        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.register(ToolHandle::bind(descriptor, service));
        }
        Ok(registry)
    }

    /// Add a handle. A handle with an existing name replaces the earlier one.
    pub fn register(&mut self, handle: ToolHandle<'s>) {
        let name = handle.name.clone();
        if self.handles.insert(name.clone(), handle).is_some() {
            warn!("Duplicate tool name {}, keeping the last registration", name);
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolHandle<'s>> {
        self.handles.get(name)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Catalog for the model, in discovery order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.handles.get(name))
            .map(ToolHandle::spec)
            .collect()
    }
}

/// Classification of a tool payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFlag {
    Data,
    Empty,
    Error,
}

/// Text heuristic that decides whether a tool payload is empty or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRule {
    /// Payloads that, once trimmed, mean "no data".
    pub empty_literals: Vec<String>,
    /// Substrings that mark a payload as an error, matched case-insensitively.
    pub error_markers: Vec<String>,
}

impl Default for ResultRule {
    fn default() -> Self {
        Self {
            empty_literals: vec!["[]".to_string(), "{}".to_string()],
            error_markers: vec!["error".to_string()],
        }
    }
}

impl ResultRule {
    pub fn classify(&self, result: &ToolInvocationResult) -> ResultFlag {
        if result.remote_error {
            return ResultFlag::Error;
        }
        let payload = result.content.trim();
        if self.empty_literals.iter().any(|literal| payload == literal) {
            return ResultFlag::Empty;
        }
        let lowered = payload.to_lowercase();
        if self
            .error_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
        {
            return ResultFlag::Error;
        }
        ResultFlag::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct EchoService {
        tools: Vec<ToolDescriptor>,
        calls: Mutex<Vec<(String, JsonObject)>>,
    }

    #[async_trait]
    impl ToolService for EchoService {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
            Ok(self.tools.clone())
        }

        async fn call_tool(
            &self,
            name: String,
            args: JsonObject,
        ) -> Result<ToolInvocationResult, ToolError> {
            self.calls.lock().unwrap().push((name.clone(), args));
            Ok(ToolInvocationResult::text(format!("called {name}")))
        }
    }

    fn descriptor(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}}
            })
            .as_object()
            .cloned()
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_each_handle_calls_its_own_tool() {
        let service = EchoService {
            tools: vec![descriptor("get_weather", "w"), descriptor("search_hotels", "h")],
            calls: Mutex::new(Vec::new()),
        };
        let registry = ToolRegistry::discover(&service).await.unwrap();
        assert_eq!(registry.len(), 2);

        let args = json!({"city": "Oslo"});
        let hotels = registry.get("search_hotels").unwrap().invoke(&args).await.unwrap();
        let weather = registry.get("get_weather").unwrap().invoke(&args).await.unwrap();

        assert_eq!(hotels.content, "called search_hotels");
        assert_eq!(weather.content, "called get_weather");
        let calls = service.calls.lock().unwrap();
        assert_eq!(calls[0].0, "search_hotels");
        assert_eq!(calls[1].0, "get_weather");
        assert_eq!(calls[1].1["city"], json!("Oslo"));
    }

    #[tokio::test]
    async fn test_duplicate_names_last_wins() {
        let service = EchoService {
            tools: vec![descriptor("dup", "first"), descriptor("dup", "second")],
            calls: Mutex::new(Vec::new()),
        };
        let registry = ToolRegistry::discover(&service).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().description, "second");
        assert_eq!(registry.specs().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_do_not_reach_the_service() {
        let service = EchoService {
            tools: vec![descriptor("get_weather", "w")],
            calls: Mutex::new(Vec::new()),
        };
        let registry = ToolRegistry::discover(&service).await.unwrap();
        let err = registry
            .get("get_weather")
            .unwrap()
            .invoke(&json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_result_rule_classification() {
        let rule = ResultRule::default();
        let classify = |text: &str| rule.classify(&ToolInvocationResult::text(text));

        assert_eq!(classify("[]"), ResultFlag::Empty);
        assert_eq!(classify(" {} \n"), ResultFlag::Empty);
        assert_eq!(classify("{\"error\": \"no flights\"}"), ResultFlag::Error);
        assert_eq!(classify("Error: upstream timeout"), ResultFlag::Error);
        assert_eq!(classify("[{\"flight\": \"TP123\"}]"), ResultFlag::Data);
        assert_eq!(classify(""), ResultFlag::Data);

        let flagged = ToolInvocationResult {
            content: "[{\"flight\": \"TP123\"}]".to_string(),
            remote_error: true,
        };
        assert_eq!(rule.classify(&flagged), ResultFlag::Error);
    }

    #[test]
    fn test_custom_result_rule() {
        let rule = ResultRule {
            empty_literals: vec!["null".to_string()],
            error_markers: vec!["FAILED".to_string()],
        };
        assert_eq!(rule.classify(&ToolInvocationResult::text("null")), ResultFlag::Empty);
        assert_eq!(rule.classify(&ToolInvocationResult::text("[]")), ResultFlag::Data);
        assert_eq!(
            rule.classify(&ToolInvocationResult::text("lookup failed")),
            ResultFlag::Error
        );
    }
}
